use rustyline::{Config, Editor, Result};

/// `> ` for a fresh conversation, `[n] > ` once `n` turns are kept.
pub fn generate_prompt(turns: usize) -> String {
    if turns == 0 {
        "> ".to_string()
    } else {
        format!("[{}] > ", turns)
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}
