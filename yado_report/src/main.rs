use std::{env, error::Error, fs, str::FromStr};

use chrono::Utc;
use num_format::{Locale, ToFormattedString};
use serde::Deserialize;
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        error!("アプリケーションエラー: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let (input, output, sort) = match args.as_slice() {
        [_, input, output] => (input, output, SortKey::MeanLatency),
        [_, input, output, sort] => (input, output, sort.parse::<SortKey>()?),
        _ => return Err("usage: yado_report <metrics.json> <out.html> [sort]".into()),
    };
    let mut records: Vec<Record> = serde_json::from_str(&fs::read_to_string(input)?)?;
    sort_records(&mut records, sort);
    fs::write(output, render(&records))?;
    info!("レポートを出力: {} ({} 件)", output, records.len());
    Ok(())
}

/// 性能試験1本分の計測値
#[derive(Debug, Clone, Deserialize)]
struct Record {
    name: String,
    requests: u64,
    failures: u64,
    mean_latency_ms: f64,
    p95_latency_ms: f64,
}

impl Record {
    fn failure_rate(&self) -> f64 {
        match self.requests {
            0 => 0.0,
            total => self.failures as f64 / total as f64,
        }
    }

    /// 失敗率5%以上でFailed、失敗ありかp95が1秒超でDegraded
    fn verdict(&self) -> Verdict {
        if self.failure_rate() >= 0.05 {
            Verdict::Failed
        } else if self.failures > 0 || self.p95_latency_ms > 1000.0 {
            Verdict::Degraded
        } else {
            Verdict::Passed
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Verdict {
    Passed,
    Degraded,
    Failed,
}

impl Verdict {
    fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "passed",
            Verdict::Degraded => "degraded",
            Verdict::Failed => "failed",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Verdict::Passed => "#2e7d32",
            Verdict::Degraded => "#f9a825",
            Verdict::Failed => "#c62828",
        }
    }
}

/// 並び替えの列
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SortKey {
    Name,
    Requests,
    Failures,
    MeanLatency,
    P95Latency,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "requests" => Ok(SortKey::Requests),
            "failures" => Ok(SortKey::Failures),
            "mean" => Ok(SortKey::MeanLatency),
            "p95" => Ok(SortKey::P95Latency),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// 名前は昇順、数値列は降順
fn sort_records(records: &mut [Record], key: SortKey) {
    match key {
        SortKey::Name => records.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Requests => records.sort_by(|a, b| b.requests.cmp(&a.requests)),
        SortKey::Failures => records.sort_by(|a, b| b.failures.cmp(&a.failures)),
        SortKey::MeanLatency => records.sort_by(|a, b| {
            b.mean_latency_ms
                .total_cmp(&a.mean_latency_ms)
        }),
        SortKey::P95Latency => {
            records.sort_by(|a, b| b.p95_latency_ms.total_cmp(&a.p95_latency_ms))
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn percentage(count: usize, total: usize) -> f64 {
    match total {
        0 => 0.0,
        total => count as f64 * 100.0 / total as f64,
    }
}

/// 扇形のSVGパス。開始角・中心角は度数法で、12時の位置から時計回り。
fn slice_path(cx: f64, cy: f64, r: f64, start: f64, sweep: f64) -> String {
    let point = |angle_deg: f64| {
        let rad = (angle_deg - 90.0).to_radians();
        (cx + r * rad.cos(), cy + r * rad.sin())
    };
    let (x1, y1) = point(start);
    let (x2, y2) = point(start + sweep);
    let large_arc = if sweep > 180.0 { 1 } else { 0 };
    format!(
        "M {:.2} {:.2} L {:.2} {:.2} A {:.2} {:.2} 0 {} 1 {:.2} {:.2} Z",
        cx, cy, x1, y1, r, r, large_arc, x2, y2
    )
}

fn pie_chart(records: &[Record]) -> String {
    let total = records.len();
    let counts = [Verdict::Passed, Verdict::Degraded, Verdict::Failed].map(|verdict| {
        (
            verdict,
            records.iter().filter(|r| r.verdict() == verdict).count(),
        )
    });
    let mut slices = String::new();
    let mut start = 0.0;
    for (verdict, count) in counts {
        if count == 0 {
            continue;
        }
        let sweep = percentage(count, total) * 3.6;
        // 100%の扇形はパスが退化するので円で描く
        if sweep >= 360.0 {
            slices.push_str(&format!(
                "<circle cx=\"100\" cy=\"100\" r=\"80\" fill=\"{}\"/>",
                verdict.color()
            ));
        } else {
            slices.push_str(&format!(
                "<path d=\"{}\" fill=\"{}\"/>",
                slice_path(100.0, 100.0, 80.0, start, sweep),
                verdict.color()
            ));
        }
        start += sweep;
    }
    let legend = counts
        .iter()
        .map(|(verdict, count)| {
            format!(
                "<li><span style=\"color:{}\">&#9632;</span> {}: {} ({:.1}%)</li>",
                verdict.color(),
                verdict.label(),
                count,
                percentage(*count, total)
            )
        })
        .collect::<String>();
    format!(
        "<svg viewBox=\"0 0 200 200\" width=\"200\" height=\"200\">{}</svg><ul class=\"legend\">{}</ul>",
        slices, legend
    )
}

fn render(records: &[Record]) -> String {
    let rows = records
        .iter()
        .map(|record| {
            format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.2}%</td><td>{:.1}</td><td>{:.1}</td><td>{}</td></tr>",
                record.verdict().label(),
                escape(&record.name),
                record.requests.to_formatted_string(&Locale::en),
                record.failures.to_formatted_string(&Locale::en),
                record.failure_rate() * 100.0,
                record.mean_latency_ms,
                record.p95_latency_ms,
                record.verdict().label(),
            )
        })
        .collect::<String>();
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n<title>性能レポート</title>\n<style>\n\
         body{{font-family:sans-serif;margin:2rem}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:.4rem .8rem;text-align:right}}\
         td:first-child,th:first-child{{text-align:left}}\
         tr.failed td{{background:#fdecea}}tr.degraded td{{background:#fff8e1}}\
         .legend{{list-style:none;padding:0}}\n</style>\n</head>\n<body>\n\
         <h1>性能レポート</h1>\n<p>生成日時: {}</p>\n{}\n\
         <table>\n<thead><tr><th>シナリオ</th><th>リクエスト数</th><th>失敗数</th>\
         <th>失敗率</th><th>平均 (ms)</th><th>p95 (ms)</th><th>判定</th></tr></thead>\n\
         <tbody>{}</tbody>\n</table>\n</body>\n</html>\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        pie_chart(records),
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, requests: u64, failures: u64, mean: f64, p95: f64) -> Record {
        Record {
            name: name.to_owned(),
            requests,
            failures,
            mean_latency_ms: mean,
            p95_latency_ms: p95,
        }
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(record("ok", 100, 0, 50.0, 200.0).verdict(), Verdict::Passed);
        assert_eq!(
            record("slow", 100, 0, 800.0, 1500.0).verdict(),
            Verdict::Degraded
        );
        assert_eq!(
            record("flaky", 100, 1, 50.0, 200.0).verdict(),
            Verdict::Degraded
        );
        assert_eq!(
            record("broken", 100, 5, 50.0, 200.0).verdict(),
            Verdict::Failed
        );
    }

    #[test]
    fn test_sort_by_mean_latency_desc() {
        let mut records = vec![
            record("a", 10, 0, 10.0, 20.0),
            record("b", 10, 0, 30.0, 40.0),
            record("c", 10, 0, 20.0, 25.0),
        ];
        sort_records(&mut records, SortKey::MeanLatency);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_name_asc() {
        let mut records = vec![
            record("bookings", 10, 0, 10.0, 20.0),
            record("auth", 10, 0, 30.0, 40.0),
        ];
        sort_records(&mut records, SortKey::Name);
        assert_eq!(records[0].name, "auth");
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("p95".parse::<SortKey>(), Ok(SortKey::P95Latency));
        assert!("latency".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_slice_path_large_arc() {
        // 270度の扇形はlarge-arcフラグが立つ
        let path = slice_path(100.0, 100.0, 80.0, 0.0, 270.0);
        assert!(path.contains(" 1 1 "));
        let path = slice_path(100.0, 100.0, 80.0, 0.0, 90.0);
        assert!(path.contains(" 0 1 "));
    }

    #[test]
    fn test_full_circle_rendered_as_circle() {
        let records = vec![record("ok", 10, 0, 10.0, 20.0)];
        let chart = pie_chart(&records);
        assert!(chart.contains("<circle"));
        assert!(!chart.contains("<path"));
    }

    #[test]
    fn test_render_contains_rows() {
        let records = vec![record("bookings", 1200, 0, 42.5, 120.0)];
        let html = render(&records);
        assert!(html.contains("<td>bookings</td>"));
        assert!(html.contains("<td>1,200</td>"));
        assert!(html.contains("passed"));
    }
}
