//! The two daily notification occasions.

/// Which of the two scheduled messages is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Occasion {
    /// Weekday morning message.
    Morning,
    /// Daily evening message.
    #[value(alias = "night")]
    Evening,
}

impl Occasion {
    pub const ALL: [Occasion; 2] = [Occasion::Morning, Occasion::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }
}

impl std::fmt::Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
