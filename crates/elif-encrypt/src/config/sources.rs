use std::fmt;

/// Where an effective configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default value used
    Default(String),
    /// Value supplied by the configuration layer with the given index
    Layer(usize),
    /// Not set anywhere
    Unset,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default(value) => write!(f, "default:{}", value),
            ConfigSource::Layer(index) => write!(f, "layer:{}", index),
            ConfigSource::Unset => write!(f, "unset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Layer(2).to_string(), "layer:2");
        assert_eq!(ConfigSource::Default("Halite".into()).to_string(), "default:Halite");
        assert_eq!(ConfigSource::Unset.to_string(), "unset");
    }
}
