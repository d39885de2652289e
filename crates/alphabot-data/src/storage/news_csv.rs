//! 뉴스 CSV 출력.

use std::cmp::Ordering;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::provider::naver_news::parse::{category_rank, parse_news_datetime};
use crate::provider::naver_news::NewsArticle;

/// UTF-8 BOM (엑셀 호환)
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 출력 파일 경로: `{dir}/naver_finance_news_{start}_{end}.csv`
pub fn news_csv_path(output_dir: impl AsRef<Path>, start: &str, end: &str) -> PathBuf {
    output_dir
        .as_ref()
        .join(format!("naver_finance_news_{}_{}.csv", start, end))
}

/// 카테고리 순서 → 날짜 내림차순으로 정렬하고 id를 1부터 다시 매김.
///
/// 날짜를 해석할 수 없는 기사는 카테고리 안에서 맨 뒤로 갑니다.
pub fn sort_and_renumber(articles: &mut [NewsArticle]) {
    articles.sort_by(|a, b| {
        category_rank(&a.category)
            .cmp(&category_rank(&b.category))
            .then_with(
                || match (parse_news_datetime(&a.date), parse_news_datetime(&b.date)) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                },
            )
    });

    for (idx, article) in articles.iter_mut().enumerate() {
        article.id = idx as u64 + 1;
    }
}

/// 기사 목록을 BOM 포함 UTF-8 CSV로 기록.
pub fn write_news_csv<W: Write>(mut writer: W, articles: &[NewsArticle]) -> Result<()> {
    writer.write_all(UTF8_BOM)?;

    let mut csv_writer = csv::Writer::from_writer(writer);
    for article in articles {
        csv_writer.serialize(article)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// 정렬 후 파일로 저장. 기사가 없으면 아무것도 쓰지 않고 None.
pub fn save_news_csv(
    output_dir: impl AsRef<Path>,
    start: &str,
    end: &str,
    mut articles: Vec<NewsArticle>,
) -> Result<Option<PathBuf>> {
    if articles.is_empty() {
        warn!(start, end, "수집된 뉴스가 없어 CSV를 만들지 않습니다");
        return Ok(None);
    }

    sort_and_renumber(&mut articles);

    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let path = news_csv_path(output_dir, start, end);

    let file = std::fs::File::create(&path)?;
    write_news_csv(std::io::BufWriter::new(file), &articles)?;

    info!(count = articles.len(), path = %path.display(), "뉴스 CSV 저장 완료");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(category: &str, date: &str, title: &str) -> NewsArticle {
        NewsArticle {
            id: 0,
            category: category.to_string(),
            date: date.to_string(),
            title: title.to_string(),
            content: "본문".to_string(),
            url: format!("https://n.news.naver.com/{}", title),
        }
    }

    #[test]
    fn test_sort_by_category_then_date_desc() {
        let mut articles = vec![
            article("환율", "2025-11-10 09:00:00", "fx"),
            article("시황/전망", "", "undated"),
            article("시황/전망", "2025-11-09 10:00:00", "older"),
            article("시황/전망", "2025.11.10. 오후 1:00", "newer"),
        ];

        sort_and_renumber(&mut articles);

        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older", "undated", "fx"]);
        let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_news_csv_has_bom_and_header() {
        let mut buf = Vec::new();
        let mut row = article("해외증시", "2025-11-10", "나스닥, 상승");
        row.id = 1;
        write_news_csv(&mut buf, &[row]).unwrap();

        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,category,date,title,content,url"));
        assert_eq!(
            lines.next(),
            Some("1,해외증시,2025-11-10,\"나스닥, 상승\",본문,\"https://n.news.naver.com/나스닥, 상승\"")
        );
    }

    #[test]
    fn test_save_skips_empty() {
        let dir = std::env::temp_dir().join("alphabot_news_csv_empty");
        let saved = save_news_csv(&dir, "20251101", "20251102", Vec::new()).unwrap();
        assert!(saved.is_none());
        assert!(!news_csv_path(&dir, "20251101", "20251102").exists());
    }

    #[test]
    fn test_save_writes_file() {
        let dir = std::env::temp_dir().join(format!("alphabot_news_csv_{}", std::process::id()));
        let saved = save_news_csv(
            &dir,
            "20251101",
            "20251102",
            vec![article("환율", "2025-11-01", "원달러")],
        )
        .unwrap()
        .unwrap();

        assert_eq!(saved, news_csv_path(&dir, "20251101", "20251102"));
        let bytes = std::fs::read(&saved).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
