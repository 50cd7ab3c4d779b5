use serde::{Deserialize, Serialize};
use std::fmt;

/// Generation tag of a tree node; a child is always one step after its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::A,
        Level::B,
        Level::C,
        Level::D,
        Level::E,
        Level::F,
        Level::G,
    ];

    /// Level of this level's children, `None` at the terminal level
    pub fn next(self) -> Option<Level> {
        match self {
            Self::A => Some(Self::B),
            Self::B => Some(Self::C),
            Self::C => Some(Self::D),
            Self::D => Some(Self::E),
            Self::E => Some(Self::F),
            Self::F => Some(Self::G),
            Self::G => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::G
    }

    /// Default label for freshly generated nodes (e.g., "Level C")
    pub fn label(self) -> String {
        format!("Level {}", self)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
        };
        write!(f, "{}", tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_walks_the_alphabet() {
        let mut level = Level::A;
        let mut seen = vec![level];
        while let Some(next) = level.next() {
            assert!(next > level);
            seen.push(next);
            level = next;
        }
        assert_eq!(seen, Level::ALL.to_vec());
        assert!(level.is_terminal());
    }

    #[test]
    fn test_label_and_serde() {
        assert_eq!(Level::C.label(), "Level C");
        assert_eq!(serde_json::to_string(&Level::B).unwrap(), "\"B\"");
        assert!(serde_json::from_str::<Level>("\"H\"").is_err());
    }
}
