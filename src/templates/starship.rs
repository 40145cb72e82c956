//! `~/.config/starship.toml`.

use super::{toml_string, Settings, COLOR_NAMES, GENERATED_BY};

pub(super) fn render(s: &Settings) -> String {
    let scheme = s.color_scheme;
    let palette = scheme.palette();
    let mut out = String::new();

    out.push_str(&format!("# {GENERATED_BY}\n"));
    out.push_str("\"$schema\" = 'https://starship.rs/config-schema.json'\n\n");
    out.push_str("add_newline = true\n");
    out.push_str("command_timeout = 1000\n");
    out.push_str(&format!("palette = {}\n", toml_string(scheme.name())));
    out.push_str(
        "format = \"\"\"\n\
         $username$hostname$directory$git_branch$git_status$python$nodejs$rust$golang\
         $cmd_duration$line_break$character\"\"\"\n\n",
    );

    out.push_str(
        "[character]\n\
         success_symbol = \"[❯](bold green)\"\n\
         error_symbol = \"[❯](bold red)\"\n\n\
         [directory]\n\
         style = \"bold blue\"\n\
         truncation_length = 3\n\
         truncate_to_repo = true\n\n\
         [git_branch]\n\
         symbol = \" \"\n\
         style = \"bold magenta\"\n\n\
         [git_status]\n\
         style = \"bold yellow\"\n\n\
         [cmd_duration]\n\
         min_time = 2000\n\
         style = \"yellow\"\n\n\
         [hostname]\n\
         ssh_only = true\n\
         style = \"bold cyan\"\n\n",
    );

    out.push_str(&format!("[palettes.{}]\n", scheme.name()));
    for (name, color) in COLOR_NAMES.iter().zip(palette.normal.iter()).skip(1) {
        out.push_str(&format!("{name} = {}\n", toml_string(color)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::tests::settings;
    use crate::templates::ColorScheme;

    #[test]
    fn test_palette_follows_scheme() {
        let mut s = settings();
        s.color_scheme = ColorScheme::GruvboxDark;
        let out = render(&s);
        assert!(out.contains("palette = \"gruvbox-dark\""));
        assert!(out.contains("[palettes.gruvbox-dark]"));
        assert!(out.contains("red = \"#cc241d\""));
        assert!(!out.contains("black ="));
    }

    #[test]
    fn test_prompt_sections_present() {
        let out = render(&settings());
        for section in ["[character]", "[directory]", "[git_branch]", "[cmd_duration]"] {
            assert!(out.contains(section), "missing {section}");
        }
        assert!(out.contains("$line_break$character"));
    }

    #[test]
    fn test_output_is_valid_toml() {
        let parsed: toml::Value = toml::from_str(&render(&settings())).unwrap();
        assert_eq!(parsed["palette"].as_str(), Some("tokyo-night"));
        assert_eq!(
            parsed["palettes"]["tokyo-night"]["blue"].as_str(),
            Some("#7aa2f7")
        );
    }
}
