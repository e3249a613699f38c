use std::borrow::Cow;

use owo_colors::OwoColorize;
use reedline::{
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, PromptViMode,
};

/// `[3] sa@test> `
pub struct SqlPrompt {
    prefix: String,
    line_count: usize,
}

impl SqlPrompt {
    pub fn new(user: &str, database: &str) -> Self {
        Self {
            prefix: format!("{}{}{}{} ", user.green().italic(), "@".black(), database.cyan(), ">".black()),
            line_count: 1,
        }
    }

    pub fn increment_line_count(&mut self) {
        self.line_count += 1;
    }
}

impl Prompt for SqlPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        format!(
            "{}{}{} {}",
            "[".black(),
            self.line_count.cyan(),
            "]".black(),
            self.prefix
        )
        .into()
    }

    fn render_prompt_right(&self) -> Cow<str> {
        "".into()
    }

    fn render_prompt_indicator(&self, prompt_mode: PromptEditMode) -> Cow<str> {
        match prompt_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                PromptViMode::Normal => format!("{}", "NORMAL".red()).into(),
                PromptViMode::Insert => format!("{}", "INSERT".green()).into(),
            },
            PromptEditMode::Custom(mode) => format!("({mode})").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        "... ".black().to_string().into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}
