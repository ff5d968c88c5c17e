//! Booking status classification

use std::fmt;

/// Display treatment for a status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Work is underway
    Positive,
    /// Waiting on something
    Caution,
    /// Finished, de-emphasized
    Muted,
    /// Unrecognized status
    Neutral,
}

impl Tone {
    /// RGB hex color the watch face uses for this tone.
    pub const fn hex_color(self) -> &'static str {
        match self {
            Self::Positive => "#4CAF50",
            Self::Caution => "#FFC107",
            Self::Muted => "#9E9E9E",
            Self::Neutral => "#FFFFFF",
        }
    }
}

/// Known booking states. Anything else is carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStatus {
    InProgress,
    Active,
    Completed,
    Pending,
    Other(String),
}

impl BookingStatus {
    /// Classify a raw status label, case- and whitespace-insensitively.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "in progress" | "in-progress" | "in_progress" => Self::InProgress,
            "active" => Self::Active,
            "completed" | "complete" => Self::Completed,
            "pending" => Self::Pending,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub const fn tone(&self) -> Tone {
        match self {
            Self::InProgress | Self::Active => Tone::Positive,
            Self::Pending => Tone::Caution,
            Self::Completed => Tone::Muted,
            Self::Other(_) => Tone::Neutral,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "In Progress"),
            Self::Active => write!(f, "Active"),
            Self::Completed => write!(f, "Completed"),
            Self::Pending => write!(f, "Pending"),
            Self::Other(label) if label.is_empty() => write!(f, "Unknown"),
            Self::Other(label) => write!(f, "{label}"),
        }
    }
}
