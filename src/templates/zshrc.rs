//! `~/.zshrc`.

use super::{shell_quote, Settings, GENERATED_BY};
use crate::tools::ZSH_PLUGINS;

pub(super) fn render(s: &Settings) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# {GENERATED_BY}. Re-running it replaces this file (the previous copy\n\
         # is kept in the backup directory). Put local additions in ~/.zshrc.local.\n\n"
    ));

    out.push_str("# --- paths ---------------------------------------------------------------\n");
    out.push_str("typeset -U path\n");
    out.push_str(&format!("path=(\"{}\" $path)\n", s.shell_path(&s.local_bin)));
    if let Some(brew) = &s.brew {
        out.push_str(&format!("eval \"$({} shellenv)\"\n", brew.display()));
    }
    out.push_str("export EDITOR=\"${EDITOR:-vim}\"\n");
    if let Some(proxy) = &s.proxy {
        let quoted = shell_quote(proxy);
        out.push_str(&format!(
            "export http_proxy={quoted} https_proxy={quoted} HTTP_PROXY={quoted} HTTPS_PROXY={quoted}\n"
        ));
    }
    if let Some(no_proxy) = &s.no_proxy {
        let quoted = shell_quote(no_proxy);
        out.push_str(&format!("export no_proxy={quoted} NO_PROXY={quoted}\n"));
    }
    out.push('\n');

    out.push_str("# --- history -------------------------------------------------------------\n");
    out.push_str(
        "HISTFILE=\"$HOME/.zsh_history\"\n\
         HISTSIZE=50000\n\
         SAVEHIST=50000\n\
         setopt SHARE_HISTORY HIST_IGNORE_ALL_DUPS HIST_REDUCE_BLANKS INC_APPEND_HISTORY\n\
         setopt AUTO_CD INTERACTIVE_COMMENTS\n\n",
    );

    out.push_str("# --- completion ----------------------------------------------------------\n");
    out.push_str("autoload -Uz compinit && compinit\n");
    out.push_str("zstyle ':completion:*' matcher-list 'm:{a-z}={A-Za-z}'\n\n");

    out.push_str("# --- plugins -------------------------------------------------------------\n");
    out.push_str(&format!(
        "ZSH_PLUGIN_DIR=\"{}\"\n",
        s.shell_path(&s.plugin_dir)
    ));
    for plugin in ZSH_PLUGINS {
        out.push_str(&format!(
            "[[ -r \"$ZSH_PLUGIN_DIR/{0}/{1}\" ]] && source \"$ZSH_PLUGIN_DIR/{0}/{1}\"\n",
            plugin.name, plugin.script
        ));
    }
    out.push('\n');

    out.push_str("# --- tools ---------------------------------------------------------------\n");
    out.push_str("command -v starship >/dev/null && eval \"$(starship init zsh)\"\n");
    out.push_str("command -v zoxide >/dev/null && eval \"$(zoxide init zsh)\"\n");
    out.push_str(
        "if command -v fzf >/dev/null; then\n\
         \x20 if fzf --zsh >/dev/null 2>&1; then\n\
         \x20   source <(fzf --zsh)\n\
         \x20 elif [[ -r /usr/share/doc/fzf/examples/key-bindings.zsh ]]; then\n\
         \x20   source /usr/share/doc/fzf/examples/key-bindings.zsh\n\
         \x20 fi\n\
         fi\n\n",
    );

    out.push_str("# --- aliases -------------------------------------------------------------\n");
    if s.eza {
        out.push_str(
            "alias ls='eza --group-directories-first'\n\
             alias ll='eza -lah --git --group-directories-first'\n\
             alias tree='eza --tree'\n",
        );
    }
    if let Some(bat) = &s.bat_command {
        out.push_str(&format!("alias cat='{bat} --paging=never'\n"));
        out.push_str(&format!(
            "export MANPAGER=\"sh -c 'col -bx | {bat} -l man -p'\"\n"
        ));
    }
    out.push_str("alias ..='cd ..'\n\n");

    out.push_str("[[ -r \"$HOME/.zshrc.local\" ]] && source \"$HOME/.zshrc.local\"\n");
    out
}
