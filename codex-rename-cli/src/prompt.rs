use std::io::{self, BufRead, Write};

use codex_rename_core::{MessageLevel, PromptError, Prompter};

/// Line-based prompts on stderr, answers read from stdin.
pub struct TerminalPrompter;

#[async_trait::async_trait]
impl Prompter for TerminalPrompter {
    async fn show_message(
        &self,
        level: MessageLevel,
        message: &str,
        detail: Option<&str>,
        actions: &[&str],
    ) -> Result<Option<String>, PromptError> {
        let text = render_message(level, message, detail);
        let options: Vec<String> = actions.iter().map(|a| a.to_string()).collect();
        ask(text, options).await
    }

    async fn quick_pick(
        &self,
        items: &[String],
        placeholder: &str,
    ) -> Result<Option<String>, PromptError> {
        if items.is_empty() {
            eprintln!("{placeholder}: nothing to choose from.");
            return Ok(None);
        }
        ask(format!("{placeholder}\n"), items.to_vec()).await
    }
}

async fn ask(text: String, options: Vec<String>) -> Result<Option<String>, PromptError> {
    tokio::task::spawn_blocking(move || -> Result<Option<String>, PromptError> {
        let mut err = io::stderr().lock();
        err.write_all(text.as_bytes())?;
        if options.is_empty() {
            return Ok(None);
        }
        choose(&mut io::stdin().lock(), &mut err, &options)
    })
    .await
    .map_err(|_| PromptError::Closed)?
}

fn render_message(level: MessageLevel, message: &str, detail: Option<&str>) -> String {
    let label = level_label(level);
    match detail {
        Some(detail) => format!("{label}: {message}\n  {detail}\n"),
        None => format!("{label}: {message}\n"),
    }
}

fn level_label(level: MessageLevel) -> &'static str {
    match level {
        MessageLevel::Info => "info",
        MessageLevel::Warning => "warning",
        MessageLevel::Error => "error",
    }
}

/// List `options` numbered from 1 and read a pick. A number or the option text
/// selects; an empty line or end of input dismisses.
fn choose(
    input: &mut impl BufRead,
    output: &mut impl Write,
    options: &[String],
) -> Result<Option<String>, PromptError> {
    for (idx, option) in options.iter().enumerate() {
        writeln!(output, "  [{}] {option}", idx + 1)?;
    }
    loop {
        write!(output, "Choose 1-{} (Enter to dismiss): ", options.len())?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(None);
        }
        let answer = line.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        if let Ok(n) = answer.parse::<usize>()
            && let Some(option) = n.checked_sub(1).and_then(|i| options.get(i))
        {
            return Ok(Some(option.clone()));
        }
        if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(answer)) {
            return Ok(Some(option.clone()));
        }
        writeln!(output, "Not an option: {answer}")?;
    }
}
