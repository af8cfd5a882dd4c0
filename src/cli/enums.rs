//! CLI enum types for aspect ratio and character gender options.

use clap::ValueEnum;

use storyforge::media::AspectRatio;
use storyforge::story::Gender;

/// Frame shape for generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Aspect {
    /// 9:16
    #[default]
    Portrait,
    /// 16:9
    Landscape,
}

impl From<Aspect> for AspectRatio {
    fn from(a: Aspect) -> Self {
        match a {
            Aspect::Portrait => AspectRatio::Portrait,
            Aspect::Landscape => AspectRatio::Landscape,
        }
    }
}

/// Gender of the main character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GenderArg {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl From<GenderArg> for Gender {
    fn from(g: GenderArg) -> Self {
        match g {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
            GenderArg::Unspecified => Gender::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_conversion() {
        assert_eq!(AspectRatio::from(Aspect::Portrait).as_str(), "9:16");
        assert_eq!(AspectRatio::from(Aspect::Landscape).as_str(), "16:9");
    }

    #[test]
    fn test_aspect_value_names() {
        assert_eq!(Aspect::from_str("landscape", true), Ok(Aspect::Landscape));
        assert!(Aspect::from_str("square", true).is_err());
    }

    #[test]
    fn test_gender_conversion() {
        assert_eq!(Gender::from(GenderArg::Female), Gender::Female);
        assert_eq!(Gender::from(GenderArg::default()), Gender::Unspecified);
    }
}
