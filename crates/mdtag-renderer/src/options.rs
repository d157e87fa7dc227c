//! Render options and their construction from configuration.

use std::path::Path;

use mdtag_config::{Charset, Config, HeadingMarks, ListMarks, Settings, StyleChoice};

use crate::error::RenderError;
use crate::flags::Flags;
use crate::style::{StyleProvider, provider_for};
use crate::terminal::{ConsoleWidth, FixedWidth, TerminalWidth};

/// Options shared by every renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Parser flags requested by the caller. Renderer capabilities are
    /// added on top.
    pub flags: Flags,
    /// Charset used to decode text runs and attributes.
    pub charset: Charset,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            flags: Flags::empty(),
            charset: Charset::Utf8,
        }
    }
}

impl RenderOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            flags: Flags::from_parser_config(&config.parser),
            charset: config.parser.charset,
        }
    }
}

/// Options of the terminal renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    pub styles: StyleChoice,
    /// Fixed rule width; the console width is queried when `None`.
    pub width: Option<usize>,
    pub list_marks: ListMarks,
    pub heading_marks: HeadingMarks,
    pub rule_char: char,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            styles: StyleChoice::default(),
            width: None,
            list_marks: ListMarks::default(),
            heading_marks: HeadingMarks::default(),
            rule_char: '-',
        }
    }
}

impl TerminalOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let terminal = &config.terminal;
        Self {
            styles: terminal.styles,
            width: terminal.width,
            list_marks: terminal.list_marks,
            heading_marks: terminal.headings,
            rule_char: terminal.rule_char,
        }
    }

    #[must_use]
    pub fn style_provider(&self) -> Box<dyn StyleProvider> {
        provider_for(self.styles)
    }

    #[must_use]
    pub fn width_provider(&self) -> Box<dyn TerminalWidth + Send> {
        match self.width {
            Some(columns) => Box::new(FixedWidth(columns)),
            None => Box::new(ConsoleWidth),
        }
    }
}

/// Load configuration and derive both option sets from it.
///
/// See [`Config::load`] for how the file is located.
pub fn load_options(
    config_path: Option<&Path>,
    settings: Option<&Settings>,
) -> Result<(RenderOptions, TerminalOptions), RenderError> {
    let config = Config::load(config_path, settings)?;
    tracing::debug!(path = ?config.config_path, "Loaded render options");
    Ok((
        RenderOptions::from_config(&config),
        TerminalOptions::from_config(&config),
    ))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use mdtag_config::{ConfigError, Dialect};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_defaults_match_default_config() {
        let config = Config::default();
        assert_eq!(RenderOptions::from_config(&config), RenderOptions::default());
        assert_eq!(
            TerminalOptions::from_config(&config),
            TerminalOptions::default()
        );
    }

    #[test]
    fn test_load_options_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mdtag.toml");
        fs::write(
            &path,
            r#"
[parser]
dialect = "github"
extensions = ["wiki_links"]
charset = "latin-1"

[terminal]
styles = "plain"
width = 40
list_marks = "source"
headings = "level"
rule_char = "="
"#,
        )
        .unwrap();

        let (render, terminal) = load_options(Some(&path), None).unwrap();
        assert_eq!(
            render.flags,
            Flags::from_dialect(Dialect::Github) | Flags::WIKI_LINKS
        );
        assert_eq!(render.charset, Charset::Latin1);
        assert_eq!(
            terminal,
            TerminalOptions {
                styles: StyleChoice::Plain,
                width: Some(40),
                list_marks: ListMarks::Source,
                heading_marks: HeadingMarks::Level,
                rule_char: '=',
            }
        );
        assert_eq!(terminal.width_provider().columns(), 40);
    }

    #[test]
    fn test_settings_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mdtag.toml");
        fs::write(&path, "[terminal]\nwidth = 40\n").unwrap();
        let settings = Settings {
            width: Some(72),
            ..Settings::default()
        };

        let (_, terminal) = load_options(Some(&path), Some(&settings)).unwrap();
        assert_eq!(terminal.width, Some(72));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_options(Some(&dir.path().join("absent.toml")), None).unwrap_err();
        assert!(matches!(err, RenderError::Config(ConfigError::NotFound(_))));
    }
}
