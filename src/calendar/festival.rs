/// Month names of the lunar-solar calendar, in calendar order.
pub const KNOWN_MONTHS: [&str; 12] = [
    "Baishakh", "Jestha", "Ashadh", "Shrawan", "Bhadra", "Ashwin", "Kartik", "Mangsir", "Poush",
    "Magh", "Falgun", "Chaitra",
];

/// One day of the festival dataset, stamped with the month it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Festival {
    /// Day-of-month label in the primary script.
    pub np: String,
    /// Day-of-month label in the Gregorian-linked numbering.
    pub en: String,
    pub tithi: String,
    pub event: String,
    pub day: u32,
    pub specialday: String,
    pub holiday: bool,
    pub month: String,
}

impl Festival {
    /// Key under which a note for this day is stored: `"{month}-{np}"`.
    pub fn date_key(&self) -> String {
        date_key(&self.month, &self.np)
    }

    pub fn has_event(&self) -> bool {
        !self.event.trim().is_empty()
    }

    pub fn is_special(&self) -> bool {
        !self.specialday.trim().is_empty()
    }
}

pub fn date_key(month: &str, day_label: &str) -> String {
    format!("{}-{}", month, day_label)
}

pub fn is_known_month(name: &str) -> bool {
    KNOWN_MONTHS.iter().any(|m| m.eq_ignore_ascii_case(name))
}
