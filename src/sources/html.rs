//! Predefined domestic news pages scraped for AI headlines.
//!
//! These sites have no feed, so every `<a href>` on the landing page is a
//! candidate. A link is kept when its text looks like a headline (10 to 100
//! characters), mentions an AI keyword and none of the navigation keywords.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{Source, get_text};
use crate::dates::format_timestamp;
use crate::error::SourceError;
use crate::images::extract::resolve_reference;
use crate::models::{Details, Entry, EntryKind};
use crate::utils::identity_key;

const TIMEOUT: Duration = Duration::from_secs(10);

const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 100;

pub const AI_KEYWORDS: &[&str] = &[
    "AI", "人工智能", "机器学习", "深度学习", "LLM", "大模型", "智能", "ChatGPT", "GPT",
];

/// Link texts containing these are site chrome, not headlines.
pub const SKIP_KEYWORDS: &[&str] = &[
    "登录", "注册", "首页", "关于", "联系", "友情链接", "广告", "合作", "招聘",
];

static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DomesticSource {
    #[value(name = "36kr-ai")]
    Kr36Ai,
    #[value(name = "sina-tech")]
    SinaTech,
    #[value(name = "zhihu-daily")]
    ZhihuDaily,
}

impl DomesticSource {
    /// Display name used as the entries' `source` tag.
    pub fn display_name(self) -> &'static str {
        match self {
            DomesticSource::Kr36Ai => "36氪AI",
            DomesticSource::SinaTech => "新浪科技",
            DomesticSource::ZhihuDaily => "知乎日报",
        }
    }

    pub fn page_url(self) -> &'static str {
        match self {
            DomesticSource::Kr36Ai => "https://36kr.com/information/AI/",
            DomesticSource::SinaTech => "https://tech.sina.com.cn/",
            DomesticSource::ZhihuDaily => "https://daily.zhihu.com/",
        }
    }
}

impl fmt::Display for DomesticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Does this link text look like an AI headline?
pub fn is_ai_headline(title: &str) -> bool {
    let len = title.chars().count();
    (MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&len)
        && !SKIP_KEYWORDS.iter().any(|kw| title.contains(kw))
        && AI_KEYWORDS.iter().any(|kw| title.contains(kw))
}

#[derive(Debug, Clone)]
pub struct HtmlSource {
    client: reqwest::Client,
    page_url: String,
    name: String,
    limit: usize,
}

impl HtmlSource {
    pub fn new(
        client: reqwest::Client,
        page_url: impl Into<String>,
        name: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            client,
            page_url: page_url.into(),
            name: name.into(),
            limit,
        }
    }

    pub fn predefined(client: reqwest::Client, source: DomesticSource, limit: usize) -> Self {
        Self::new(client, source.page_url(), source.display_name(), limit)
    }

    /// Harvest headline links from a page.
    fn harvest(&self, html: &str, base: &Url, now: DateTime<Utc>) -> Vec<Entry> {
        let document = Html::parse_document(html);
        let created_at = format_timestamp(&now);
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for link in document.select(&LINKS) {
            if entries.len() >= self.limit {
                break;
            }
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            let title: String = link.text().map(str::trim).collect();
            if href.is_empty() || !is_ai_headline(&title) {
                continue;
            }
            let Some(url) = resolve_reference(href, base) else {
                debug!(%href, "Unresolvable link");
                continue;
            };
            if !seen.insert(identity_key(url.as_str())) {
                continue;
            }
            entries.push(Entry {
                title,
                url: url.to_string(),
                summary: String::new(),
                source: self.name.clone(),
                kind: EntryKind::News,
                created_at: created_at.clone(),
                image: None,
                images: Vec::new(),
                details: Details::News { points: None },
            });
        }
        entries
    }
}

impl Source for HtmlSource {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(level = "info", skip_all, fields(url = %self.page_url, source = %self.name))]
    async fn try_fetch(&self) -> Result<Vec<Entry>, SourceError> {
        let base = Url::parse(&self.page_url).map_err(|e| SourceError::Unparseable {
            url: self.page_url.clone(),
            reason: e.to_string(),
        })?;
        let html = get_text(
            self.client.get(&self.page_url).timeout(TIMEOUT),
            &self.page_url,
        )
        .await?;
        Ok(self.harvest(&html, &base, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<html><body>
        <nav><a href="/login">登录后查看更多AI大模型资讯内容</a><a href="/">首页</a></nav>
        <a href="/p/1"><span>OpenAI 发布新一代 GPT 模型，</span><span>性能大幅提升</span></a>
        <a href="/p/2">今日股市收盘行情分析与展望报告</a>
        <a href="https://other.example.com/p/3">国内大模型厂商加速布局人工智能应用</a>
        <a href="/p/1">OpenAI 发布新一代 GPT 模型，性能大幅提升</a>
        <a href="https://news.example.cn/p/1">OpenAI 发布新一代 GPT 模型的详细解读</a>
        <a href="/p/1#comments">OpenAI 新一代 GPT 模型评论区讨论汇总</a>
        <a href="/p/4">AI</a>
        <a href="javascript:void(0)">点击这里了解更多人工智能相关的新闻</a>
        <a href="/p/5">深度学习框架对比：从入门到精通的完整指南</a>
    </body></html>"#;

    fn source(limit: usize) -> HtmlSource {
        HtmlSource::new(Client::new(), "https://news.example.cn/tech/", "示例", limit)
    }

    #[test]
    fn test_is_ai_headline() {
        assert!(is_ai_headline("国内大模型厂商加速布局人工智能应用"));
        assert!(!is_ai_headline("AI"));
        assert!(!is_ai_headline("今日股市收盘行情分析与展望报告"));
        assert!(!is_ai_headline("登录后查看更多AI大模型资讯内容"));
        assert!(!is_ai_headline(&"AI".repeat(60)));
    }

    #[test]
    fn test_harvest_filters_resolves_and_dedupes() {
        let base = Url::parse("https://news.example.cn/tech/").unwrap();
        let entries = source(10).harvest(PAGE, &base, Utc::now());
        let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://news.example.cn/p/1",
                "https://other.example.com/p/3",
                "https://news.example.cn/p/5",
            ]
        );
        assert_eq!(entries[0].title, "OpenAI 发布新一代 GPT 模型，性能大幅提升");
        assert!(entries.iter().all(|e| e.source == "示例" && e.summary.is_empty()));
    }

    #[test]
    fn test_harvest_dedupes_on_resolved_url() {
        let page = r#"
            <a href="/p/1">OpenAI 发布新一代 GPT 模型，性能大幅提升</a>
            <a href="https://news.example.cn/p/1">OpenAI 发布新一代 GPT 模型的详细解读</a>
            <a href="/p/1#comments">OpenAI 新一代 GPT 模型评论区讨论汇总</a>
            <a href="../p/1/">OpenAI 新一代 GPT 模型上手体验与测评</a>"#;
        let base = Url::parse("https://news.example.cn/tech/").unwrap();
        let entries = source(10).harvest(page, &base, Utc::now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://news.example.cn/p/1");
    }

    #[test]
    fn test_harvest_caps_at_limit() {
        let base = Url::parse("https://news.example.cn/").unwrap();
        assert_eq!(source(1).harvest(PAGE, &base, Utc::now()).len(), 1);
    }

    #[test]
    fn test_predefined_sources() {
        let s = DomesticSource::from_str("sina-tech", false).unwrap();
        assert_eq!(s, DomesticSource::SinaTech);
        assert_eq!(s.page_url(), "https://tech.sina.com.cn/");
        assert_eq!(DomesticSource::Kr36Ai.to_string(), "36氪AI");
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let source = HtmlSource::new(Client::new(), format!("{}/news/", server.uri()), "mock", 3);
        let entries = source.fetch().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url, format!("{}/p/1", server.uri()));
    }
}
