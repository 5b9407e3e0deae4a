// Unit Tests for the Pipeline Coordinator
//
// UNIT UNDER TEST: Analyzer (+ popularity)
//
// BUSINESS RESPONSIBILITY:
//   - Orchestrates enrichment, batching, classification, merging,
//     summarization, ranking, and rendering for each chatroom
//   - Tolerates per-batch failures without losing the run
//   - Keeps filtered records out of every topic
//   - Ranks deterministically given identical model outputs
//
// TEST COVERAGE:
//   - The concrete end-to-end scenarios seeding the suite: basic
//     classification, partial batch failure, filtered content, popularity
//     ordering
//   - Popularity formula values and boundaries
//   - Empty-chatroom and determinism behaviors

use crate::analyzer::{popularity, Analyzer};
use crate::config::{AnalyzerConfig, BatchOptions, LlmOptions};
use crate::error::AnalyzerError;
use crate::records::MessageRecord;
use crate::report;
use crate::store::InMemoryStore;
use crate::tests::helpers::{canned_failure, record, summary_response, CannedProvider};

use chrono::NaiveDate;
use std::sync::Arc;

fn test_config() -> AnalyzerConfig {
    AnalyzerConfig {
        llm: LlmOptions {
            model_name: "test-model".to_string(),
            api_base_url: "http://localhost".to_string(),
            api_key: "test-key".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 20).expect("valid date")
}

fn day_rows() -> Vec<MessageRecord> {
    vec![
        record("m1", 1768903200, "room1", "alice", "特斯拉又涨了"), // 10:00:00
        record("m2", 1768903205, "room1", "bob", "是 Q4 财报"),     // 10:00:05
        record("m3", 1768903260, "room1", "alice", "晚上吃啥"),     // 10:01:00
    ]
}

const TWO_TOPIC_RESPONSE: &str = "\
<<<RESULT_START>>>
<<<TOPIC>>>
keywords: 特斯拉, 财报
participants:
- alice
- bob
message_indices: 1-2
message_count: 2
confidence: 0.9
notes:
<<<TOPIC>>>
keywords: 晚餐
participants:
- alice
message_indices: 3
message_count: 1
confidence: 0.6
notes:
<<<RESULT_END>>>";

fn analyzer_with(
    rows: Vec<MessageRecord>,
    script: Vec<crate::error::AnalyzerResult<String>>,
    config: AnalyzerConfig,
) -> (Analyzer, Arc<CannedProvider>) {
    let provider = Arc::new(CannedProvider::new(script));
    let analyzer = Analyzer::new(
        config,
        Arc::new(InMemoryStore::new(rows)),
        provider.clone(),
    )
    .expect("config should validate");
    (analyzer, provider)
}

#[cfg(test)]
mod popularity_tests {
    use super::*;

    #[test]
    fn test_no_participants_means_zero_popularity() {
        assert_eq!(popularity(0, 100), 0.0);
    }

    #[test]
    fn test_popularity_is_positive_otherwise() {
        assert!(popularity(1, 1) > 0.0);
    }

    #[test]
    fn test_formula_value_below_the_knee() {
        // U=8, M=40: M/U = 5 < 6, no saturation penalty
        let expected = 9f64.ln().powf(1.2) * 41f64.ln().powf(0.8);
        assert!((popularity(8, 40) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_formula_applies_saturation_past_the_knee() {
        // U=3, M=60: M/U = 20, penalty (1 + 14)^-0.4
        let expected = 4f64.ln().powf(1.2) * 61f64.ln().powf(0.8) * 15f64.powf(-0.4);
        assert!((popularity(3, 60) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_broad_topic_outranks_dominated_one() {
        // Eight people on 40 messages beat three people on 60
        assert!(popularity(8, 40) > popularity(3, 60));
    }
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_classification_ranks_and_resolves() {
        let script = vec![
            Ok(TWO_TOPIC_RESPONSE.to_string()),
            Ok(summary_response("特斯拉财报", "market", "讨论财报。")),
            Ok(summary_response("晚餐", "life", "商量晚饭。")),
        ];
        let (analyzer, _) = analyzer_with(day_rows(), script, test_config());

        let report = analyzer
            .analyze(test_date(), None)
            .await
            .expect("run should succeed");

        assert_eq!(report.sections.len(), 1);
        let section = &report.sections[0];
        assert_eq!(section.chatroom, "room1");
        assert_eq!(section.message_total, 3);
        assert_eq!(section.topics.len(), 2);

        // The two-participant topic outranks the one-participant topic
        let first = &section.topics[0];
        let second = &section.topics[1];
        assert!(first.popularity > second.popularity);
        assert_eq!(first.title, "特斯拉财报");

        let ids: Vec<&str> = first.merged.message_ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        // Markdown lists the winner in row 1
        let row_one = report
            .markdown
            .lines()
            .find(|l| l.starts_with("| 1 |"))
            .expect("table should have a first row");
        assert!(row_one.contains("特斯拉财报"));
    }

    #[tokio::test]
    async fn test_partial_batch_failure_keeps_the_run() {
        // One message per batch: three classification calls, the middle
        // one dies after retries
        let config = AnalyzerConfig {
            batch: BatchOptions {
                max_tokens: 6000,
                max_messages: 1,
            },
            ..test_config()
        };
        let script = vec![
            Ok("<<<RESULT_START>>>\n<<<TOPIC>>>\nkeywords: 甲\nparticipants:\n- alice\nmessage_indices: 1\n<<<RESULT_END>>>".to_string()),
            canned_failure(),
            Ok("<<<RESULT_START>>>\n<<<TOPIC>>>\nkeywords: 乙\nparticipants:\n- alice\nmessage_indices: 1\n<<<RESULT_END>>>".to_string()),
            Ok(summary_response("甲", "life", "a")),
            Ok(summary_response("乙", "life", "b")),
        ];
        let (analyzer, _) = analyzer_with(day_rows(), script, config);

        let report = analyzer
            .analyze(test_date(), None)
            .await
            .expect("partial failure must not abort the run");

        assert_eq!(report.sections[0].topics.len(), 2);
        let failure = report
            .warnings
            .iter()
            .find(|w| w.batch_index == Some(1))
            .expect("the failed batch should be named");
        assert_eq!(failure.chatroom, "room1");
        assert!(failure.cause.contains("503"), "cause: {}", failure.cause);
    }

    #[tokio::test]
    async fn test_filtered_content_never_reaches_topics() {
        // Ten messages, six with no topical value
        let mut rows = Vec::new();
        for n in 0..4 {
            rows.push(record(
                &format!("keep{}", n),
                1768903200 + n,
                "room1",
                "alice",
                &format!("正文{}", n),
            ));
        }
        for n in 0..6 {
            rows.push(record(
                &format!("drop{}", n),
                1768903300 + n,
                "room1",
                "bob",
                "<msg><voicemsg length=\"900\"/></msg>",
            ));
        }

        // The model greedily claims the whole index space
        let script = vec![
            Ok("<<<RESULT_START>>>\n<<<TOPIC>>>\nkeywords: 正文\nparticipants:\n- alice\nmessage_indices: 1-9999\n<<<RESULT_END>>>".to_string()),
            Ok(summary_response("正文", "life", "s")),
        ];
        let (analyzer, provider) = analyzer_with(rows, script, test_config());

        let report = analyzer
            .analyze(test_date(), None)
            .await
            .expect("run should succeed");

        // The prompt carried exactly the four surviving lines
        let calls = provider.calls.lock().await;
        let classify_prompt = &calls[0][1].content;
        for seq in 1..=4 {
            assert!(classify_prompt.contains(&format!("#{} ", seq)));
        }
        assert!(!classify_prompt.contains("#5 "));

        // And no filtered id leaked into the topic
        let topic = &report.sections[0].topics[0];
        assert_eq!(topic.merged.message_count, 4);
        assert!(topic.merged.message_ids.iter().all(|id| id.starts_with("keep")));
    }

    #[tokio::test]
    async fn test_empty_chatroom_still_gets_a_section() {
        let wanted = vec!["room1".to_string()];
        let (analyzer, _) = analyzer_with(vec![], vec![], test_config());

        let report = analyzer
            .analyze(test_date(), Some(&wanted))
            .await
            .expect("empty day should succeed");

        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].message_total, 0);
        assert!(report.sections[0].topics.is_empty());
        assert!(report.markdown.contains("- Messages: 0"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.cause.contains("no data")));
    }

    #[tokio::test]
    async fn test_identical_inputs_render_identically() {
        let script = || {
            vec![
                Ok(TWO_TOPIC_RESPONSE.to_string()),
                Ok(summary_response("特斯拉财报", "market", "讨论财报。")),
                Ok(summary_response("晚餐", "life", "商量晚饭。")),
            ]
        };

        let (first, _) = analyzer_with(day_rows(), script(), test_config());
        let (second, _) = analyzer_with(day_rows(), script(), test_config());

        let report_a = first.analyze(test_date(), None).await.expect("run a");
        let report_b = second.analyze(test_date(), None).await.expect("run b");

        // Byte-identical once the generation timestamp is pinned
        let stamp = chrono::DateTime::from_timestamp(1768950000, 0)
            .expect("valid stamp")
            .to_utc();
        let rendered_a = report::render(test_date(), stamp, &report_a.sections);
        let rendered_b = report::render(test_date(), stamp, &report_b.sections);
        assert_eq!(rendered_a, rendered_b);
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_any_io() {
        let result = Analyzer::new(
            AnalyzerConfig::default(),
            Arc::new(InMemoryStore::new(vec![])),
            Arc::new(CannedProvider::new(vec![])),
        );

        assert!(matches!(
            result,
            Err(AnalyzerError::ConfigurationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_top_n_caps_reported_topics() {
        let config = AnalyzerConfig {
            report: crate::config::ReportOptions { top_n: 1 },
            ..test_config()
        };
        let script = vec![
            Ok(TWO_TOPIC_RESPONSE.to_string()),
            Ok(summary_response("特斯拉财报", "market", "讨论财报。")),
            Ok(summary_response("晚餐", "life", "商量晚饭。")),
        ];
        let (analyzer, _) = analyzer_with(day_rows(), script, config);

        let report = analyzer.analyze(test_date(), None).await.expect("run");
        assert_eq!(report.sections[0].topics.len(), 1);
        assert_eq!(report.sections[0].topics[0].title, "特斯拉财报");
    }
}
