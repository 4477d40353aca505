//! Line-oriented presenter for terminal operators.
//!
//! Works over any async reader/writer pair so the same code drives the
//! interactive binary (stdin/stdout) and in-memory tests. A line holding
//! only `!` is the cancellation gesture; end of input also cancels.

use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::presenter::{
    ChoiceOption, InteractionPresenter, PresentationRequest, PresenterFuture, Resolution,
};
use crate::Result;

/// Input line that cancels the open dialog.
pub const CANCEL_GESTURE: &str = "!";

/// Invalid answers tolerated before the dialog resolves as "no selection".
const MAX_ATTEMPTS: usize = 3;

/// Terminal presenter over an async line reader and writer.
pub struct ConsolePresenter<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl ConsolePresenter<BufReader<Stdin>, Stdout> {
    /// Presenter bound to the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsolePresenter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Build a presenter over `reader` and `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Write one line of output.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the writer fails.
    pub async fn write_line(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Show `prompt` and read one trimmed line; `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if reading or writing fails.
    pub async fn prompt_line(&self, prompt: &str) -> Result<Option<String>> {
        {
            let mut writer = self.writer.lock().await;
            writer.write_all(prompt.as_bytes()).await?;
            writer.flush().await?;
        }
        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line.trim().to_owned()))
        }
    }

    /// Consume the presenter, returning the writer (tests inspect output).
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    async fn render(&self, request: PresentationRequest) -> Result<Resolution> {
        match request {
            PresentationRequest::Notice {
                title,
                message,
                buttons,
            } => self.notice(title, &message, &buttons).await,
            PresentationRequest::SingleChoice {
                title,
                options,
                preselected,
                free_text,
            } => {
                self.single_choice(&title, &options, preselected, free_text)
                    .await
            }
            PresentationRequest::MultiChoice {
                title,
                options,
                selected,
                max_selections,
            } => {
                self.multi_choice(&title, &options, &selected, max_selections)
                    .await
            }
            PresentationRequest::Slider {
                title,
                min,
                max,
                step,
                value,
            } => self.slider(&title, min, max, step, value).await,
            PresentationRequest::Date {
                title,
                format,
                value,
            } => self.date(&title, &format, value.as_deref()).await,
            PresentationRequest::Custom { name, input } => {
                self.write_line(&format!("[{name}] {input}")).await?;
                Ok(match self.prompt_line("> ").await? {
                    None => Resolution::Cancelled,
                    Some(line) if line == CANCEL_GESTURE => Resolution::Cancelled,
                    Some(line) if line.is_empty() => Resolution::Acknowledged,
                    Some(line) => Resolution::Value(Value::String(line)),
                })
            }
        }
    }

    async fn notice(
        &self,
        title: Option<String>,
        message: &str,
        buttons: &[String],
    ) -> Result<Resolution> {
        if let Some(title) = title {
            self.write_line(&format!("== {title} ==")).await?;
        }
        self.write_line(message).await?;
        if buttons.len() <= 1 {
            return Ok(match self.prompt_line("[enter] ").await? {
                None => Resolution::Cancelled,
                Some(line) if line == CANCEL_GESTURE => Resolution::Cancelled,
                Some(_) => Resolution::Acknowledged,
            });
        }
        for (idx, caption) in buttons.iter().enumerate() {
            self.write_line(&format!("  {}) {caption}", idx + 1)).await?;
        }
        for _ in 0..MAX_ATTEMPTS {
            match self.prompt_line("> ").await? {
                None => return Ok(Resolution::Cancelled),
                Some(line) if line == CANCEL_GESTURE => return Ok(Resolution::Cancelled),
                Some(line) => {
                    if let Some(idx) = parse_index(&line, buttons.len()) {
                        return Ok(Resolution::Value(json!(idx + 1)));
                    }
                    self.write_line("choose one of the listed buttons").await?;
                }
            }
        }
        Ok(Resolution::NoSelection)
    }

    async fn single_choice(
        &self,
        title: &str,
        options: &[ChoiceOption],
        preselected: Option<usize>,
        free_text: bool,
    ) -> Result<Resolution> {
        self.write_line(title).await?;
        self.list_options(options, |idx| preselected == Some(idx))
            .await?;
        for _ in 0..MAX_ATTEMPTS {
            let Some(line) = self.prompt_line("> ").await? else {
                return Ok(Resolution::Cancelled);
            };
            if line == CANCEL_GESTURE {
                return Ok(Resolution::Cancelled);
            }
            if line.is_empty() {
                return Ok(preselected
                    .and_then(|idx| options.get(idx))
                    .map_or(Resolution::NoSelection, |opt| {
                        Resolution::Value(Value::String(opt.code.clone()))
                    }));
            }
            if let Some(idx) = parse_index(&line, options.len()) {
                return Ok(Resolution::Value(Value::String(options[idx].code.clone())));
            }
            if free_text {
                return Ok(Resolution::Value(Value::String(line)));
            }
            self.write_line("choose one of the listed options").await?;
        }
        Ok(Resolution::NoSelection)
    }

    async fn multi_choice(
        &self,
        title: &str,
        options: &[ChoiceOption],
        selected: &[usize],
        max_selections: Option<usize>,
    ) -> Result<Resolution> {
        self.write_line(title).await?;
        self.list_options(options, |idx| selected.contains(&idx))
            .await?;
        for _ in 0..MAX_ATTEMPTS {
            let Some(line) = self.prompt_line("(comma separated) > ").await? else {
                return Ok(Resolution::Cancelled);
            };
            if line == CANCEL_GESTURE {
                return Ok(Resolution::Cancelled);
            }
            let picks = if line.is_empty() {
                Some(selected.to_vec())
            } else {
                line.split([',', ' '])
                    .filter(|part| !part.is_empty())
                    .map(|part| parse_index(part, options.len()))
                    .collect::<Option<Vec<usize>>>()
            };
            match picks {
                Some(mut picks) if !matches!(max_selections, Some(max) if picks.len() > max) => {
                    picks.sort_unstable();
                    picks.dedup();
                    let codes: Vec<Value> = picks
                        .into_iter()
                        .filter_map(|idx| options.get(idx))
                        .map(|opt| Value::String(opt.code.clone()))
                        .collect();
                    return Ok(Resolution::Value(Value::Array(codes)));
                }
                _ => self.write_line("choose listed options only").await?,
            }
        }
        Ok(Resolution::NoSelection)
    }

    async fn slider(
        &self,
        title: &str,
        min: f64,
        max: f64,
        step: f64,
        value: Option<f64>,
    ) -> Result<Resolution> {
        self.write_line(&format!("{title} [{min} .. {max}, step {step}]"))
            .await?;
        for _ in 0..MAX_ATTEMPTS {
            let Some(line) = self.prompt_line("> ").await? else {
                return Ok(Resolution::Cancelled);
            };
            if line == CANCEL_GESTURE {
                return Ok(Resolution::Cancelled);
            }
            if line.is_empty() {
                return Ok(value.map_or(Resolution::NoSelection, |v| Resolution::Value(json!(v))));
            }
            match line.parse::<f64>() {
                Ok(number) if (min..=max).contains(&number) => {
                    return Ok(Resolution::Value(json!(number)));
                }
                _ => self.write_line("value out of range").await?,
            }
        }
        Ok(Resolution::NoSelection)
    }

    async fn date(&self, title: &str, format: &str, value: Option<&str>) -> Result<Resolution> {
        self.write_line(&format!("{title} ({format})")).await?;
        let pattern = chrono_pattern(format);
        for _ in 0..MAX_ATTEMPTS {
            let Some(line) = self.prompt_line("> ").await? else {
                return Ok(Resolution::Cancelled);
            };
            if line == CANCEL_GESTURE {
                return Ok(Resolution::Cancelled);
            }
            if line.is_empty() {
                return Ok(value.map_or(Resolution::NoSelection, |v| {
                    Resolution::Value(Value::String(v.to_owned()))
                }));
            }
            if NaiveDate::parse_from_str(&line, &pattern).is_ok() {
                return Ok(Resolution::Value(Value::String(line)));
            }
            self.write_line(&format!("expected a date formatted as {format}"))
                .await?;
        }
        Ok(Resolution::NoSelection)
    }

    async fn list_options(
        &self,
        options: &[ChoiceOption],
        marked: impl Fn(usize) -> bool,
    ) -> Result<()> {
        for (idx, option) in options.iter().enumerate() {
            let mark = if marked(idx) { "*" } else { " " };
            self.write_line(&format!(
                " {mark}{}) {} - {}",
                idx + 1,
                option.code,
                option.label
            ))
            .await?;
        }
        Ok(())
    }
}

impl<R, W> InteractionPresenter for ConsolePresenter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn present(&self, request: PresentationRequest) -> PresenterFuture<'_> {
        Box::pin(self.render(request))
    }
}

/// Parse a 1-based option number into a 0-based index below `len`.
fn parse_index(text: &str, len: usize) -> Option<usize> {
    text.trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=len).contains(n))
        .map(|n| n - 1)
}

/// Translate an engine date format (`YYYYMMDD`, `DD/MM/YYYY`, …) into a
/// `chrono` pattern.
#[must_use]
pub fn chrono_pattern(format: &str) -> String {
    format
        .replace("YYYY", "%Y")
        .replace("YY", "%y")
        .replace("MM", "%m")
        .replace("DD", "%d")
}
