//! `~/.config/alacritty/alacritty.toml`.

use super::{toml_string, Settings, COLOR_NAMES, GENERATED_BY};

pub(super) fn render(s: &Settings) -> String {
    let palette = s.color_scheme.palette();
    let family = toml_string(&s.font_family);
    let mut out = String::new();

    out.push_str(&format!(
        "# {GENERATED_BY} (color scheme: {})\n\n",
        s.color_scheme
    ));

    out.push_str("[env]\nTERM = \"xterm-256color\"\n\n");

    out.push_str("[window]\n");
    out.push_str("padding = { x = 8, y = 8 }\n");
    out.push_str("dynamic_padding = true\n");
    out.push_str("decorations = \"Full\"\n");
    if s.macos {
        out.push_str("option_as_alt = \"Both\"\n");
    }
    out.push('\n');

    out.push_str("[scrolling]\nhistory = 10000\n\n");

    // `{:?}` always keeps a fractional part, so TOML reads a float.
    out.push_str(&format!("[font]\nsize = {:?}\n\n", s.font_size));
    for (section, style) in [
        ("normal", "Regular"),
        ("bold", "Bold"),
        ("italic", "Italic"),
        ("bold_italic", "Bold Italic"),
    ] {
        out.push_str(&format!(
            "[font.{section}]\nfamily = {family}\nstyle = {}\n\n",
            toml_string(style)
        ));
    }

    out.push_str(&format!(
        "[colors.primary]\nbackground = {}\nforeground = {}\n\n",
        toml_string(palette.background),
        toml_string(palette.foreground)
    ));
    for (section, colors) in [("normal", palette.normal), ("bright", palette.bright)] {
        out.push_str(&format!("[colors.{section}]\n"));
        for (name, color) in COLOR_NAMES.iter().zip(colors.iter()) {
            out.push_str(&format!("{name} = {}\n", toml_string(color)));
        }
        out.push('\n');
    }

    out.push_str("[selection]\nsave_to_clipboard = true\n");
    out
}
