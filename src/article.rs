//! Markdown article generation from the day's entries.
//!
//! One prompt, one completion. The generator never fails: with no entries it
//! returns [`EMPTY_MESSAGE`] without touching the network, and when the model
//! call fails it returns the raw entries as pretty JSON behind
//! [`FALLBACK_HEADER`], so the caller always has something to write.

use std::fmt::Write as _;
use tracing::{error, info, instrument};

use crate::error::GenerationError;
use crate::llm::AskAsync;
use crate::models::{Entry, EntryKind};
use crate::utils::ellipsize;

pub const SYSTEM_PROMPT: &str = "You are a professional AI-industry commentator who excels at \
analyzing technology trends and writing in-depth articles.";

pub const EMPTY_MESSAGE: &str = "No AI news or papers were found today.";

pub const FALLBACK_HEADER: &str = "Article generation failed; raw data follows:";

/// Characters of each summary quoted in the prompt.
const PROMPT_SUMMARY_CHARS: usize = 100;

const INSTRUCTIONS: &str = "\
Requirements:
1. Open with an engaging introduction to the theme
2. Analyze and comment on the news highlights in depth
3. Pick 1-2 important papers and introduce them in detail
4. Offer insight into where the AI industry is heading
5. Use Markdown formatting, with emoji where it helps readability
6. Keep the article between 800 and 1200 words
7. Start each paragraph with its citation source, e.g. [Hacker News], [ArXiv]

Article:";

/// Build the user prompt for `entries` on `date`.
pub fn build_prompt(entries: &[Entry], date: &str) -> String {
    let (news, papers): (Vec<&Entry>, Vec<&Entry>) =
        entries.iter().partition(|e| e.kind == EntryKind::News);

    let mut prompt = format!(
        "Write an in-depth article based on the following AI news highlights and latest papers for {date}.\n\n## News highlights\n"
    );
    for n in &news {
        let _ = writeln!(
            prompt,
            "- {}: {} (source: {})",
            n.title,
            ellipsize(&n.summary, PROMPT_SUMMARY_CHARS),
            n.source
        );
    }
    prompt.push_str("\n## Latest papers\n");
    for p in &papers {
        let _ = writeln!(
            prompt,
            "- {}: {} (authors: {})",
            p.title,
            ellipsize(&p.summary, PROMPT_SUMMARY_CHARS),
            p.authors()
        );
    }
    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);
    prompt
}

/// The raw-data dump returned when the model call fails.
pub fn fallback_article(entries: &[Entry]) -> String {
    let dump = serde_json::to_string_pretty(entries)
        .unwrap_or_else(|e| format!("<entries could not be serialized: {e}>"));
    format!("{FALLBACK_HEADER}\n\n{dump}")
}

#[derive(Debug)]
pub struct ArticleGenerator<A> {
    llm: A,
}

impl<A> ArticleGenerator<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(llm: A) -> Self {
        Self { llm }
    }

    /// One completion request for non-empty `entries`.
    pub async fn try_generate(&self, entries: &[Entry], date: &str) -> Result<String, GenerationError> {
        self.llm.ask(SYSTEM_PROMPT, &build_prompt(entries, date)).await
    }

    /// Article for `entries`, the empty message, or the raw-data fallback.
    #[instrument(level = "info", skip_all, fields(entries = entries.len(), %date))]
    pub async fn generate(&self, entries: &[Entry], date: &str) -> String {
        if entries.is_empty() {
            info!("No entries; skipping article generation");
            return EMPTY_MESSAGE.to_string();
        }
        match self.try_generate(entries, date).await {
            Ok(article) => {
                info!(chars = article.chars().count(), "Article generated");
                article
            }
            Err(e) => {
                error!(error = %e, "Article generation failed; writing raw data instead");
                fallback_article(entries)
            }
        }
    }
}
