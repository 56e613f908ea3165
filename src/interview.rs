use anyhow::{anyhow, Context, Result};
use std::io::{BufRead, Write};

use crate::builder::ResponseBuilder;
use crate::models::AnswerValue;
use crate::schema::{FieldKind, QuestionField};

/// Line-oriented questionnaire over any reader/writer pair.
pub struct Interview<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Interview<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Walks every active field in order, re-asking until each answer is
    /// accepted. Fields hidden by earlier answers are skipped.
    pub fn run(&mut self, builder: &mut ResponseBuilder) -> Result<()> {
        let mut number = 0;
        for field in builder.schema().fields() {
            if !builder.is_active(field.id)? {
                continue;
            }
            number += 1;
            self.ask(builder, field, number)?;
        }

        loop {
            let missing = builder.missing();
            if missing.is_empty() {
                return Ok(());
            }
            for id in missing {
                let Some(field) = builder.schema().field(&id) else {
                    continue;
                };
                number += 1;
                self.ask(builder, field, number)?;
            }
        }
    }

    fn ask(
        &mut self,
        builder: &mut ResponseBuilder,
        field: &QuestionField,
        number: usize,
    ) -> Result<()> {
        loop {
            let options = builder.options_for(field.id)?;
            writeln!(self.output, "\n{}. {}", number, field.prompt)?;
            for (idx, option) in options.iter().enumerate() {
                writeln!(self.output, "  {}) {}", idx + 1, option)?;
            }
            match (field.kind, field.range) {
                (FieldKind::MultiChoice, _) if field.required => {
                    writeln!(self.output, "  (numbers or names, separated by commas)")?
                }
                (FieldKind::MultiChoice, _) => writeln!(
                    self.output,
                    "  (numbers or names, separated by commas; blank for none)"
                )?,
                (FieldKind::Integer, Some((min, max))) => {
                    writeln!(self.output, "  (a number from {} to {})", min, max)?
                }
                _ => {}
            }
            write!(self.output, "> ")?;
            self.output.flush()?;

            let raw = self.read_line()?;
            let value = parse_input(field, options, &raw);
            match builder.set_answer(field.id, value) {
                Ok(()) if field.required && is_empty_list(builder.answer(field.id)) => {
                    writeln!(self.output, "Please select at least one option.")?;
                }
                Ok(()) => return Ok(()),
                Err(e) if e.is_input_error() => writeln!(self.output, "{}", e)?,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        if read == 0 {
            return Err(anyhow!("Input ended before the questionnaire was complete"));
        }
        Ok(line.trim().to_string())
    }
}

fn is_empty_list(value: Option<&AnswerValue>) -> bool {
    matches!(value, Some(AnswerValue::List(items)) if items.is_empty())
}

/// Resolves a typed option: a 1-based number or a case-insensitive name.
/// Anything else is passed through so validation can reject it.
fn resolve_choice(options: &[&str], token: &str) -> String {
    if let Ok(n) = token.parse::<usize>() {
        if n >= 1 && n <= options.len() {
            return options[n - 1].to_string();
        }
    }
    options
        .iter()
        .find(|opt| opt.eq_ignore_ascii_case(token))
        .map(|opt| opt.to_string())
        .unwrap_or_else(|| token.to_string())
}

pub fn parse_input(field: &QuestionField, options: &[&str], raw: &str) -> AnswerValue {
    let raw = raw.trim();
    match field.kind {
        FieldKind::SingleChoice => AnswerValue::Text(resolve_choice(options, raw)),
        FieldKind::MultiChoice => AnswerValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| resolve_choice(options, token))
                .collect(),
        ),
        FieldKind::Integer => match raw.parse::<i64>() {
            Ok(n) => AnswerValue::Integer(n),
            Err(_) => AnswerValue::Text(raw.to_string()),
        },
        FieldKind::FreeText => AnswerValue::Text(raw.to_string()),
    }
}
