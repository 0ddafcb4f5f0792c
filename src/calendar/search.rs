use super::Festival;

/// Festivals whose event name or `"{month} {day}"` string contains `query`,
/// ignoring case, in their original order. An empty query keeps everything.
pub fn filter<'a>(festivals: &'a [Festival], query: &str) -> Vec<&'a Festival> {
    let query = query.to_lowercase();
    festivals
        .iter()
        .filter(|f| matches_lowered(f, &query))
        .collect()
}

fn matches_lowered(festival: &Festival, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    if festival.event.to_lowercase().contains(query) {
        return true;
    }
    let date_string = format!("{} {}", festival.month.to_lowercase(), festival.day);
    date_string.contains(query)
}
