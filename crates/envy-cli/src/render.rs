use std::collections::BTreeMap;
use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};
use envy_core::{EnvChange, PathList, Shorten};

pub const PREFIX: &str = "[envy]";
pub const COLOR_ROLES: [&str; 3] = ["prefix", "change", "restore"];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn current_output_style() -> OutputStyle {
    output_style_for(
        std::io::stderr().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    )
}

pub fn output_style_for(is_terminal: bool, no_color: bool) -> OutputStyle {
    if is_terminal && !no_color {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Change,
    Restore,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Palette {
    pub prefix: Style,
    pub change: Style,
    pub restore: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            prefix: Style::new()
                .fg_color(Some(AnsiColor::Blue.into()))
                .effects(Effects::BOLD),
            change: Style::new().fg_color(Some(AnsiColor::Green.into())),
            restore: Style::new().fg_color(Some(AnsiColor::Yellow.into())),
        }
    }
}

impl Palette {
    /// Applies configured colours over the defaults; unknown entries are
    /// ignored here and reported by the config check.
    pub fn from_colors(colors: &BTreeMap<String, String>) -> Self {
        let mut palette = Self::default();
        for (role, name) in colors {
            let Some(color) = parse_ansi_color(name) else {
                continue;
            };
            match role.as_str() {
                "prefix" => {
                    palette.prefix = Style::new()
                        .fg_color(Some(color.into()))
                        .effects(Effects::BOLD)
                }
                "change" => palette.change = Style::new().fg_color(Some(color.into())),
                "restore" => palette.restore = Style::new().fg_color(Some(color.into())),
                _ => {}
            }
        }
        palette
    }

    fn for_role(&self, role: Role) -> Style {
        match role {
            Role::Change => self.change,
            Role::Restore => self.restore,
        }
    }
}

/// Accepts `red`, `bright-red`, `bright_red` and `brightred`, any case.
pub fn parse_ansi_color(name: &str) -> Option<AnsiColor> {
    let name = name.trim().to_ascii_lowercase().replace(['-', '_'], "");
    let color = match name.as_str() {
        "black" => AnsiColor::Black,
        "red" => AnsiColor::Red,
        "green" => AnsiColor::Green,
        "yellow" => AnsiColor::Yellow,
        "blue" => AnsiColor::Blue,
        "magenta" => AnsiColor::Magenta,
        "cyan" => AnsiColor::Cyan,
        "white" => AnsiColor::White,
        "brightblack" | "gray" | "grey" => AnsiColor::BrightBlack,
        "brightred" => AnsiColor::BrightRed,
        "brightgreen" => AnsiColor::BrightGreen,
        "brightyellow" => AnsiColor::BrightYellow,
        "brightblue" => AnsiColor::BrightBlue,
        "brightmagenta" => AnsiColor::BrightMagenta,
        "brightcyan" => AnsiColor::BrightCyan,
        "brightwhite" => AnsiColor::BrightWhite,
        _ => return None,
    };
    Some(color)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub fn render_line(style: OutputStyle, palette: &Palette, role: Role, text: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{PREFIX} {text}"),
        OutputStyle::Rich => format!(
            "{} {}",
            colorize(palette.prefix, PREFIX),
            colorize(palette.for_role(role), text)
        ),
    }
}

/// One line per net change: PATH removals, restored variables, PATH
/// additions in PATH order, then new values.
pub fn format_change_lines(
    changes: &[EnvChange],
    path: &PathList,
    shorten: &Shorten,
) -> Vec<(Role, String)> {
    let mut lines = Vec::new();

    for removed in path.removed() {
        lines.push((
            Role::Restore,
            format!("restore: PATH -= {}", shorten.path(removed)),
        ));
    }
    for change in changes.iter().filter(|change| change.restored) {
        let text = match &change.value {
            Some(value) => format!("restore: {} = {}", change.key, shorten.value(value)),
            None => format!("restore: unset {}", change.key),
        };
        lines.push((Role::Restore, text));
    }

    for entry in path.get().iter().filter(|entry| path.added().contains(*entry)) {
        lines.push((Role::Change, format!("PATH += {}", shorten.path(entry))));
    }
    for change in changes.iter().filter(|change| !change.restored) {
        let text = match &change.value {
            Some(value) => format!("{} = {}", change.key, shorten.value(value)),
            None => format!("unset {}", change.key),
        };
        lines.push((Role::Change, text));
    }

    lines
}
