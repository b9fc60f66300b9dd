//! End-to-end pipeline runs against the fixture corpus and database.

use std::sync::Arc;

use quarry_core::config::{DatasetConfig, QuarryConfig, RoutingMode};
use quarry_core::models::{AnswerRecord, FormatHint, Question};
use quarry_core::traits::{Cancellable, CancellationToken, ILanguageModel, PromptKind};
use quarry_pipeline::Pipeline;
use quarry_retrieval::{Corpus, RankerOptions, SegmentOptions, TextRanker};
use quarry_sql::SqliteDataset;
use serde_json::json;
use test_fixtures::northwind::expected;
use test_fixtures::{NorthwindDb, ScriptedModel};

fn pipeline(db: &NorthwindDb, model: Arc<dyn ILanguageModel>) -> Pipeline {
    let mut config = QuarryConfig::default();
    config.routing.mode = Some(RoutingMode::Rubric);
    let corpus = Corpus::load(&test_fixtures::docs_dir(), SegmentOptions::default()).unwrap();
    let ranker = Arc::new(TextRanker::new(Arc::new(corpus), RankerOptions::default()));
    let dataset = SqliteDataset::open(db.path(), &DatasetConfig::default()).unwrap();
    Pipeline::new(&config, model, ranker, Arc::new(dataset))
}

fn ask(p: &Pipeline, id: &str, question: &str, hint: &str) -> AnswerRecord {
    p.answer(&Question::new(id, question, hint), &CancellationToken::new())
}

fn assert_close(value: &serde_json::Value, expected: f64) {
    let got = value.as_f64().unwrap();
    assert!((got - expected).abs() < 0.005, "{got} != {expected}");
}

#[test]
fn top_three_products_are_sorted_descending() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let rec = ask(&p, "q1", "Top 3 products by revenue", "list[{product:str, revenue:float}]");

    let items = rec.final_answer.as_array().unwrap();
    assert_eq!(items.len(), 3);
    let revenues: Vec<f64> = items.iter().map(|i| i["revenue"].as_f64().unwrap()).collect();
    assert!(revenues.windows(2).all(|w| w[0] >= w[1]));
    assert!(revenues.iter().all(|r| *r >= 0.0));
    for (item, (product, revenue)) in items.iter().zip(expected::TOP3_PRODUCTS) {
        assert_eq!(item["product"], json!(product));
        assert_close(&item["revenue"], revenue);
    }
    assert!(rec.citations.contains(&"Products".to_string()));
}

#[test]
fn december_aov_filters_the_month() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let rec = ask(&p, "q2", "What is the AOV for December 1997?", "float");

    assert!(rec.sql.contains("1997-12-01"), "{}", rec.sql);
    assert!(rec.sql.contains("1998-01-01"), "{}", rec.sql);
    assert_close(&rec.final_answer, expected::AOV_DECEMBER_1997);
    assert!(rec.confidence > 0.9);
}

#[test]
fn unquoted_identifier_is_repaired_once() {
    let db = NorthwindDb::create();
    let model = Arc::new(
        ScriptedModel::new().reply(PromptKind::Sql, "SELECT COUNT(*) AS n FROM Order Details"),
    );
    let p = pipeline(&db, model.clone()).with_trace(true);
    let rec = ask(&p, "q", "How many order lines were sold?", "int");

    assert_eq!(rec.final_answer, json!(14));
    assert!(rec.sql.contains("\"Order Details\""), "{}", rec.sql);
    assert_ne!(rec.sql, "SELECT COUNT(*) AS n FROM Order Details");
    assert_eq!(model.calls(PromptKind::Repair), 0);
    let query = rec.trace.unwrap().into_iter().find(|s| s.stage == "query").unwrap();
    assert_eq!(query.summary, "succeeded after 1 repairs");
    assert!((rec.confidence - 0.75 * 0.35 / 0.65 - 0.30 / 0.65).abs() < 1e-6);
}

#[test]
fn repairs_stop_at_the_bound() {
    let db = NorthwindDb::create();
    let model = Arc::new(
        ScriptedModel::new()
            .always(PromptKind::Sql, "SELECT Foo FROM Orders")
            .reply(PromptKind::Repair, "SELECT Bar FROM Orders")
            .reply(PromptKind::Repair, "SELECT Baz FROM Orders")
            .always(PromptKind::Repair, "SELECT Qux FROM Orders"),
    );
    let p = pipeline(&db, model.clone()).with_trace(true);
    let rec = ask(&p, "q", "How many widgets were sold?", "int");

    assert_eq!(model.calls(PromptKind::Repair), 2);
    assert_eq!(rec.final_answer, json!(0));
    assert!(rec.confidence < 0.5);
    assert!(rec.explanation.contains("No data available"));
    let query = rec.trace.unwrap().into_iter().find(|s| s.stage == "query").unwrap();
    assert_eq!(query.summary, "exhausted after 3 attempts");
}

#[test]
fn string_functions_pass_the_guard() {
    let db = NorthwindDb::create();
    let sql = "SELECT COUNT(*) AS n FROM Products WHERE replace(ProductName,' ','') <> ''";
    let model = Arc::new(ScriptedModel::new().reply(PromptKind::Sql, sql));
    let p = pipeline(&db, model.clone());
    let rec = ask(&p, "q", "How many products are listed?", "int");

    assert_eq!(rec.final_answer, json!(7));
    assert_eq!(rec.sql, sql);
    assert_eq!(model.calls(PromptKind::Repair), 0);
}

#[test]
fn malformed_first_query_gets_a_repair() {
    let db = NorthwindDb::create();
    let model = Arc::new(
        ScriptedModel::new()
            .reply(PromptKind::Sql, "SELECT COUNT(*) AS n FROM Invoices")
            .reply(PromptKind::Repair, "SELECT COUNT(*) AS n FROM Orders"),
    );
    let p = pipeline(&db, model.clone()).with_trace(true);
    let rec = ask(&p, "q", "How many orders were placed?", "int");

    assert_eq!(rec.final_answer, json!(8));
    assert_eq!(rec.sql, "SELECT COUNT(*) AS n FROM Orders");
    assert_eq!(model.calls(PromptKind::Repair), 1);
    let query = rec.trace.unwrap().into_iter().find(|s| s.stage == "query").unwrap();
    assert_eq!(query.summary, "succeeded after 1 repairs");
}

#[test]
fn absent_passage_answers_with_low_confidence() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let rec = ask(
        &p,
        "rag_missing",
        "According to the product policy, what is the warranty period in months for Electronics?",
        "int",
    );

    assert_eq!(rec.final_answer, json!(0));
    assert!(rec.confidence < 0.5);
    assert!(!rec.explanation.is_empty());
    assert!(rec.sql.is_empty());
}

#[test]
fn absent_passage_stays_low_when_the_model_guesses() {
    let db = NorthwindDb::create();
    let question = "According to the product policy, what is the warranty period in months for Electronics?";

    let model = Arc::new(ScriptedModel::new().reply(PromptKind::Answer, "18"));
    let rec = ask(&pipeline(&db, model), "rag_missing", question, "int");
    assert_eq!(rec.final_answer, json!(18));
    assert!(rec.confidence < 0.5, "confidence {}", rec.confidence);

    let model = Arc::new(ScriptedModel::new().reply(PromptKind::Answer, "The passages do not say."));
    let rec = ask(&pipeline(&db, model), "rag_missing", question, "str");
    assert!(rec.confidence < 0.5, "confidence {}", rec.confidence);
}

#[test]
fn policy_question_is_answered_from_the_document() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let batch = test_fixtures::sample_batch();
    let rec = p.answer(&batch[0], &CancellationToken::new());

    assert_eq!(rec.final_answer, json!(14));
    assert_eq!(rec.citations, vec!["product_policy::chunk0"]);
    assert!(rec.sql.is_empty());
    assert!(rec.confidence > 0.5);
}

#[test]
fn sample_batch_matches_known_answers() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let batch = test_fixtures::sample_batch();
    let records: Vec<AnswerRecord> = batch
        .iter()
        .map(|q| p.answer(q, &CancellationToken::new()))
        .collect();

    for (q, rec) in batch.iter().zip(&records) {
        assert_eq!(q.id, rec.id);
        assert!(q.format_hint.conforms(&rec.final_answer), "{}: {}", q.id, rec.final_answer);
        assert!((0.0..=1.0).contains(&rec.confidence));
        assert!(!rec.citations.is_empty(), "{} has no citations", q.id);
    }

    let (category, quantity) = expected::SUMMER_1997_TOP_CATEGORY;
    assert_eq!(records[1].final_answer, json!({"category": category, "quantity": quantity}));
    assert!(records[1].citations.contains(&"marketing_calendar::chunk1".to_string()));

    assert_close(&records[2].final_answer, expected::AOV_DECEMBER_1997);
    assert!(records[2].citations.contains(&"marketing_calendar::chunk2".to_string()));

    assert_eq!(records[3].final_answer.as_array().unwrap().len(), 3);
    assert_close(&records[4].final_answer, expected::BEVERAGES_REVENUE_JUNE_1997);

    let (customer, margin) = expected::TOP_MARGIN_CUSTOMER_1997;
    assert_eq!(records[5].final_answer["customer"], json!(customer));
    assert_close(&records[5].final_answer["margin"], margin);
}

#[test]
fn query_answers_are_idempotent() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let batch = test_fixtures::sample_batch();
    for q in &batch {
        let first = p.answer(q, &CancellationToken::new());
        let second = p.answer(q, &CancellationToken::new());
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.final_answer, second.final_answer);
        assert_eq!(first.citations, second.citations);
    }
}

#[test]
fn unavailable_model_without_template_names_the_collaborator() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let rec = ask(&p, "q", "How many widgets were sold?", "{n:int}");

    assert_eq!(rec.final_answer, json!({"n": 0}));
    assert_eq!(rec.confidence, 0.0);
    assert!(rec.explanation.contains("language model"), "{}", rec.explanation);
    assert!(rec.sql.is_empty());
}

#[test]
fn cancelled_question_yields_timed_out_fallback() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    let token = CancellationToken::new();
    token.cancel();
    let rec = p.answer(
        &Question::new("q", "Top 3 products by revenue", "list[{product:str, revenue:float}]"),
        &token,
    );

    assert_eq!(rec.final_answer, json!([]));
    assert_eq!(rec.confidence, 0.0);
    assert_eq!(rec.explanation, "timed out");
    assert!(rec.citations.is_empty());
}

#[test]
fn trace_lists_the_route_stage_plan() {
    let db = NorthwindDb::create();
    let p = pipeline(&db, Arc::new(ScriptedModel::unavailable())).with_trace(true);
    let rec = ask(&p, "q1", "Top 3 products by revenue", "list[{product:str, revenue:float}]");

    let stages: Vec<String> = rec.trace.unwrap().into_iter().map(|s| s.stage).collect();
    assert_eq!(stages, ["route", "plan", "query", "compose", "validate"]);

    let untraced = pipeline(&db, Arc::new(ScriptedModel::unavailable()));
    assert!(ask(&untraced, "q1", "Top 3 products by revenue", "list").trace.is_none());
}

#[test]
fn failed_route_classification_degrades_to_hybrid() {
    let db = NorthwindDb::create();
    let mut config = QuarryConfig::default();
    config.routing.mode = Some(RoutingMode::Model);
    let corpus = Corpus::load(&test_fixtures::docs_dir(), SegmentOptions::default()).unwrap();
    let ranker = Arc::new(TextRanker::new(Arc::new(corpus), RankerOptions::default()));
    let dataset = SqliteDataset::open(db.path(), &DatasetConfig::default()).unwrap();
    let model = Arc::new(ScriptedModel::new().reply(PromptKind::Route, "no idea"));
    let p = Pipeline::new(&config, model, ranker, Arc::new(dataset)).with_trace(true);

    let rec = ask(&p, "q2", "What is the AOV for December 1997?", "float");
    let trace = rec.trace.unwrap();
    assert_eq!(trace[0].summary, "hybrid (fallback)");
    assert!(trace.iter().any(|s| s.stage == "rank"));
    assert_close(&rec.final_answer, expected::AOV_DECEMBER_1997);
    assert!(rec.confidence < 1.0);
    assert!(FormatHint::Float.conforms(&rec.final_answer));
}
