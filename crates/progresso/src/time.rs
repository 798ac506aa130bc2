use chrono::{Local, NaiveDateTime};

/// Source of "now" for export timestamps; fixed in tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    #[cfg(test)]
    Fixed(NaiveDateTime),
}

impl Clock {
    /// Current local wall-clock time according to this clock
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            #[cfg(test)]
            Clock::Fixed(t) => *t,
        }
    }

    /// Format like a pt-BR locale string, e.g. `18/10/2026, 14:05:09`
    pub fn timestamp(&self) -> String {
        self.now().format("%d/%m/%Y, %H:%M:%S").to_string()
    }
}
