//! 네이버 금융 뉴스 HTML 파싱 (네트워크 없음).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::NewsError;

/// 뉴스포커스 카테고리.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsCategory {
    pub name: &'static str,
    pub section_id: u32,
}

/// 수집 카테고리 (출력 정렬 순서와 동일).
pub const CATEGORIES: [NewsCategory; 6] = [
    NewsCategory { name: "시황/전망", section_id: 401 },
    NewsCategory { name: "기업/종목분석", section_id: 402 },
    NewsCategory { name: "해외증시", section_id: 403 },
    NewsCategory { name: "채권/선물", section_id: 404 },
    NewsCategory { name: "공시/메모", section_id: 406 },
    NewsCategory { name: "환율", section_id: 429 },
];

/// section_id3 값으로 카테고리 찾기.
pub fn category_by_section(section_id: u32) -> Option<NewsCategory> {
    CATEGORIES.iter().copied().find(|c| c.section_id == section_id)
}

/// 카테고리 정렬 순서 (목록에 없으면 맨 뒤).
pub fn category_rank(name: &str) -> usize {
    CATEGORIES
        .iter()
        .position(|c| c.name == name)
        .unwrap_or(CATEGORIES.len())
}

/// 리스트 페이지 경로 (`finance.naver.com` 기준 상대 경로).
pub fn list_path(section_id: u32, date: &str, page: u32) -> String {
    format!(
        "/news/news_list.naver?mode=LSS3D&section_id=101&section_id2=258&section_id3={}&date={}&page={}",
        section_id, date, page
    )
}

// ==================== 날짜 ====================

/// `YYYYMMDD` 또는 `YYYY-MM-DD`를 `YYYYMMDD`로 통일.
pub fn normalize_date(raw: &str) -> Result<String, NewsError> {
    let s = raw.trim();
    let digits_only = |v: &str| v.chars().all(|c| c.is_ascii_digit());

    let normalized = if s.len() == 8 && digits_only(s) {
        s.to_string()
    } else if s.len() == 10
        && s.as_bytes()[4] == b'-'
        && s.as_bytes()[7] == b'-'
        && digits_only(&s[..4])
        && digits_only(&s[5..7])
        && digits_only(&s[8..])
    {
        s.replace('-', "")
    } else {
        return Err(NewsError::InvalidDate(raw.to_string()));
    };

    NaiveDate::parse_from_str(&normalized, "%Y%m%d")
        .map_err(|_| NewsError::InvalidDate(raw.to_string()))?;
    Ok(normalized)
}

/// 시작일~종료일 (양 끝 포함, 과거 → 최근). 순서가 뒤집혀 있으면 바꿔서 처리.
pub fn date_range(start: &str, end: &str) -> Result<Vec<String>, NewsError> {
    let parse = |s: &str| -> Result<NaiveDate, NewsError> {
        let normalized = normalize_date(s)?;
        NaiveDate::parse_from_str(&normalized, "%Y%m%d")
            .map_err(|_| NewsError::InvalidDate(s.to_string()))
    };

    let (mut from, mut to) = (parse(start)?, parse(end)?);
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }

    let mut dates = Vec::new();
    let mut cur = from;
    while cur <= to {
        dates.push(cur.format("%Y%m%d").to_string());
        cur += Duration::days(1);
    }
    Ok(dates)
}

static DATETIME_IN_TEXT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\d{4}\.\d{2}\.\d{2}\s*[^\d]{0,3}\d{1,2}:\d{2}").ok());

static DATE_IN_TEXT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d{4}\.\d{2}\.\d{2}").ok());

static LOOSE_DATETIME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(\d{4})[.\-](\d{1,2})[.\-](\d{1,2})\.?(?:\s*(오전|오후|AM|PM|am|pm)?\s*(\d{1,2}):(\d{2})(?::(\d{2}))?)?",
    )
    .ok()
});

/// 기사 날짜 문자열을 정렬용 시각으로 변환.
///
/// `2025-11-10 14:23:01`, `2025.11.10. 오후 2:23`, `2025.11.10 14:23`, `2025.11.10` 형식을 읽습니다.
pub fn parse_news_datetime(raw: &str) -> Option<NaiveDateTime> {
    let re = LOOSE_DATETIME.as_ref()?;
    let caps = re.captures(raw.trim())?;

    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, num(2)?, num(3)?)?;

    let Some(mut hour) = num(5) else {
        return date.and_hms_opt(0, 0, 0);
    };
    let minute = num(6)?;
    let second = num(7).unwrap_or(0);

    match caps.get(4).map(|m| m.as_str()) {
        Some("오후") | Some("PM") | Some("pm") if hour < 12 => hour += 12,
        Some("오전") | Some("AM") | Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    Some(date.and_time(NaiveTime::from_hms_opt(hour, minute, second)?))
}

// ==================== 리스트 페이지 ====================

/// 리스트에서 찾은 기사 링크.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
}

fn page_param(href: &str) -> Option<u32> {
    let base = Url::parse("https://finance.naver.com/").ok()?;
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
}

/// 해당 날짜 리스트의 마지막 페이지 번호.
///
/// `table.Nnavi`가 없으면 1, `td.pgRR a`(맨뒤)가 있으면 그 page 값,
/// 아니면 네비게이션 링크 page 값의 최댓값.
pub fn parse_last_page(html: &str) -> u32 {
    let document = Html::parse_document(html);

    let Some(nav) = Selector::parse("table.Nnavi")
        .ok()
        .and_then(|sel| document.select(&sel).next())
    else {
        return 1;
    };

    if let Ok(sel) = Selector::parse("td.pgRR a[href]") {
        if let Some(page) = nav
            .select(&sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(page_param)
        {
            return page.max(1);
        }
    }

    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return 1;
    };
    nav.select(&anchor_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(page_param)
        .max()
        .unwrap_or(1)
        .max(1)
}

/// 상대 링크를 절대 URL로.
///
/// `news_read.naver` 링크는 금융 도메인, 나머지는 뉴스 도메인 기준으로 붙입니다.
pub fn resolve_article_href(href: &str, finance_base: &str, news_base: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http") {
        return Some(href.to_string());
    }

    let base = if href.contains("news_read.naver") {
        finance_base
    } else {
        news_base
    };
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

/// 리스트 페이지 가운데 영역(`ul.realtimeNewsList`)의 기사 링크 추출.
pub fn parse_article_links(html: &str, finance_base: &str, news_base: &str) -> Vec<ArticleLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(
        "ul.realtimeNewsList dd.articleSubject a[href], ul.realtimeNewsList dt.articleSubject a[href]",
    ) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let url = resolve_article_href(href, finance_base, news_base)?;

            let title = a
                .value()
                .attr("title")
                .map(str::to_string)
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| element_text(&a, ""));
            let title = title.trim().to_string();

            (title.chars().count() >= 2).then_some(ArticleLink { title, url })
        })
        .collect()
}

/// 금융 도메인 기사 링크를 `n.news.naver.com` 기사 주소로 정규화.
pub fn canonical_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let host = parsed.host_str().unwrap_or_default();

    if host.ends_with("news.naver.com") {
        return url.to_string();
    }

    if host == "finance.naver.com" && parsed.path().contains("news_read.naver") {
        let mut article_id = None;
        let mut office_id = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "article_id" if !value.is_empty() => article_id = Some(value.into_owned()),
                "office_id" if !value.is_empty() => office_id = Some(value.into_owned()),
                _ => {}
            }
        }

        if let (Some(aid), Some(oid)) = (article_id, office_id) {
            return format!("https://n.news.naver.com/mnews/article/{}/{}", oid, aid);
        }
    }

    url.to_string()
}

// ==================== 기사 본문 ====================

/// 기사 페이지에서 추출한 정보.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetail {
    pub title: String,
    pub date: String,
    pub content: String,
}

/// 공백 제거한 텍스트 조각들을 구분자로 연결.
fn element_text(el: &ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    document.select(&sel).next()
}

/// 기사 제목, 날짜, 본문 추출.
pub fn parse_article_detail(html: &str) -> ArticleDetail {
    let document = Html::parse_document(html);

    let title = select_first(
        &document,
        "h2.media_end_head_headline, h3#articleTitle, h2#articleTitle",
    )
    .map(|el| element_text(&el, " "))
    .unwrap_or_default();

    let mut date = select_first(
        &document,
        "span.media_end_head_info_datestamp_time._ARTICLE_DATE_TIME, span._ARTICLE_DATE_TIME",
    )
    .map(|el| {
        el.value()
            .attr("data-date-time")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| element_text(&el, ""))
    })
    .unwrap_or_default();

    if date.is_empty() {
        let page_text = element_text(&document.root_element(), " ");
        date = DATETIME_IN_TEXT
            .as_ref()
            .and_then(|re| re.find(&page_text))
            .or_else(|| DATE_IN_TEXT.as_ref().and_then(|re| re.find(&page_text)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }

    let content = select_first(&document, "article#dic_area")
        .or_else(|| select_first(&document, "article._article_content"))
        .map(|el| element_text(&el, " "))
        .unwrap_or_default();

    ArticleDetail { title, date, content }
}
