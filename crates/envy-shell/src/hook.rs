use crate::ShellKind;

/// The rc-file snippet that re-runs `envy hook` before every prompt.
pub fn hook_snippet(kind: ShellKind, exe: &str) -> String {
    let exe = kind.writer().quote(exe);
    match kind {
        ShellKind::Bash => format!(
            "_envy_hook() {{\n  local previous_exit_status=$?\n  eval \"$({exe} hook --shell bash)\"\n  return $previous_exit_status\n}}\nif [[ \";${{PROMPT_COMMAND:-}};\" != *\";_envy_hook;\"* ]]; then\n  PROMPT_COMMAND=\"_envy_hook${{PROMPT_COMMAND:+;$PROMPT_COMMAND}}\"\nfi\n"
        ),
        ShellKind::Zsh => format!(
            "_envy_hook() {{\n  eval \"$({exe} hook --shell zsh)\"\n}}\nautoload -Uz add-zsh-hook\nadd-zsh-hook precmd _envy_hook\n"
        ),
        ShellKind::Fish => format!(
            "function __envy_hook --on-event fish_prompt\n    {exe} hook --shell fish | source\nend\n"
        ),
    }
}
