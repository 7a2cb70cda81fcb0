//! Typed lookups and writes over a mocked Creatio instance

mod common;

use common::*;
use creatio_client::CreatioClient;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMPTY: &str = "00000000-0000-0000-0000-000000000000";

async fn client(server: &MockServer) -> CreatioClient {
    mount_token(server, 1).await;
    CreatioClient::with_options(oauth_environment(server), fast_options()).unwrap()
}

#[tokio::test]
async fn test_get_contacts_selects_fields_and_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .and(query_param(
            "$select",
            "Id,Name,AccountId,Phone,MobilePhone,Email,Surname,GivenName,MiddleName",
        ))
        .and(query_param("$top", "10"))
        .respond_with(results(json!([
            { "Id": "c-1", "Name": "Jane Doe", "Email": "jane@example.com" },
            { "Id": "c-2", "Name": "John Roe", "AccountId": EMPTY }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let contacts = client(&server).await.get_contacts(10).await.unwrap();

    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].email.as_deref(), Some("jane@example.com"));
    assert!(contacts[1].account_id.is_none());
}

#[tokio::test]
async fn test_get_contacts_empty_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;

    let contacts = client(&server).await.get_contacts(10).await.unwrap();
    assert!(contacts.is_empty());
}

#[tokio::test]
async fn test_order_by_id() {
    let server = MockServer::start().await;
    let id = "51d67a11-703f-4f86-9814-e079ee362cab";
    Mock::given(method("GET"))
        .and(path(collection_path("OrderCollection")))
        .and(query_param("$filter", format!("Id eq guid'{}'", id)))
        .and(query_param("$top", "1"))
        .respond_with(results(json!([{
            "Id": id,
            "Number": "ORD-42",
            "AccountId": "a-1",
            "Amount": "99.90",
            "Date": "/Date(1652707200000)/"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let order = client(&server).await.order_by_id(id).await.unwrap().unwrap();

    assert_eq!(order.number.as_deref(), Some("ORD-42"));
    assert_eq!(order.amount, Some(99.9));
}

#[tokio::test]
async fn test_missing_order_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("OrderCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;

    let order = client(&server).await.order_by_number("NOPE").await.unwrap();
    assert!(order.is_none());
}

#[tokio::test]
async fn test_lookup_service_error_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("OrderCollection")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": { "message": { "value": "Bad filter" } } })),
        )
        .mount(&server)
        .await;

    let error = client(&server).await.order_by_number("X").await.unwrap_err();
    assert!(format!("{:#}", error).contains("Bad filter"));
}

#[tokio::test]
async fn test_add_order_returns_new_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/", collection_path("OrderCollection"))))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "d": { "Id": "o-new" } })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .await
        .add_order(&json!({ "Number": "ORD-43" }))
        .await
        .unwrap();

    assert_eq!(id.as_deref(), Some("o-new"));
}

#[tokio::test]
async fn test_set_order_state_reports_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(record_path("OrderCollection", "o-1")))
        .and(body_json(json!({ "StatusId": "s-1" })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "error": { "message": { "value": "Invalid status" } } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server).await.set_order_state("o-1", "s-1").await.unwrap();

    assert!(!outcome.ok);
    assert_eq!(outcome.message.as_deref(), Some("Invalid status"));
}

#[tokio::test]
async fn test_country_iso2_is_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("CountryCollection")))
        .and(query_param("$filter", "Code eq 'FRA'"))
        .respond_with(results(json!([{ "Id": "country-fr" }])))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server).await.country_id_by_iso_code("FR").await.unwrap();
    assert_eq!(id.as_deref(), Some("country-fr"));
}

#[tokio::test]
async fn test_contact_lookup_falls_back_to_placeholder_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .and(query_param("$filter", "(Account/Id eq guid'a-1' and Name eq ' Doe')"))
        .respond_with(results(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("ContactCollection")))
        .and(query_param("$filter", "(Account/Id eq guid'a-1' and Name eq 'Prénom Doe')"))
        .respond_with(results(json!([{ "Id": "c-9" }])))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .await
        .contact_id_by_account_and_name("a-1", "", "Doe")
        .await
        .unwrap();

    assert_eq!(id.as_deref(), Some("c-9"));
}

#[tokio::test]
async fn test_special_prices_by_tariff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("AccountRangeCollection")))
        .and(query_param("$filter", "CodeTarifEBP eq 'T1'"))
        .respond_with(results(json!([{ "Id": "p-1" }, { "Id": "p-2" }])))
        .mount(&server)
        .await;

    let ids = client(&server).await.special_prices_by_tariff("T1").await.unwrap();
    assert_eq!(ids, vec!["p-1".to_string(), "p-2".to_string()]);
}

#[tokio::test]
async fn test_text_question_answers_with_interview_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbQuestionInQuestionnaireCollection")))
        .respond_with(results(json!([{ "Id": "qiq-1", "GlbAnswerTypeId": "type-text", "GlbIsList": false }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerTypeCollection")))
        .respond_with(results(json!([{ "Name": "Text" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnsweredQuestionCollection")))
        .and(query_param("$select", "GlbTextAnswer,GlbInterviewId"))
        .respond_with(results(json!([
            { "GlbTextAnswer": "Very satisfied", "GlbInterviewId": "i-1" },
            { "GlbTextAnswer": "", "GlbInterviewId": "i-2" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbInterviewCollection")))
        .respond_with(results(json!([{
            "Id": "i-1",
            "GlbAccountId": "a-1",
            "GlbContactId": EMPTY,
            "UsrOpportunityId": EMPTY
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("AccountCollection")))
        .respond_with(results(json!([{ "Name": "Acme" }])))
        .mount(&server)
        .await;

    let answers = client(&server)
        .await
        .question_answers("question-1", "questionnaire-1")
        .await
        .unwrap();

    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].answers, vec!["Very satisfied".to_string()]);
    assert_eq!(answers[0].account_name.as_deref(), Some("Acme"));
    assert!(answers[0].contact_id.is_none());
    assert!(answers[0].opportunity_name.is_none());
}

#[tokio::test]
async fn test_upsert_answered_choice_creates_missing_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnsweredChoiceCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/", collection_path("GlbAnsweredChoiceCollection"))))
        .and(body_json(json!({
            "GlbAnswerInQuestionId": "aiq-1",
            "GlbAnsweredQuestionId": "aq-1",
            "GlbInterviewId": "i-1",
            "GlbIsChecked": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "d": { "Id": "choice-1" } })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server)
        .await
        .upsert_answered_choice("aiq-1", "aq-1", "i-1")
        .await
        .unwrap();

    assert!(outcome.ok);
    assert_eq!(outcome.id.as_deref(), Some("choice-1"));
}

fn offered_answer_filter(answer_id: &str, question_in_questionnaire_id: &str) -> String {
    format!(
        "(GlbAnswer/Id eq guid'{}' and GlbQuestionInQuestionnaire/Id eq guid'{}')",
        answer_id, question_in_questionnaire_id
    )
}

#[tokio::test]
async fn test_competitor_answer_id_walks_answers_with_the_same_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("UsrExternalisationConcurrentConnectCollection")))
        .and(query_param("$filter", "Id eq guid'comp-1'"))
        .respond_with(results(json!([{ "Name": "La Poste" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerCollection")))
        .and(query_param("$filter", "Name eq 'La Poste'"))
        .respond_with(results(json!([{ "Id": "ans-1" }, { "Id": "ans-2" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerInQuestionCollection")))
        .and(query_param("$filter", offered_answer_filter("ans-1", "qiq-1")))
        .respond_with(results(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerInQuestionCollection")))
        .and(query_param("$filter", offered_answer_filter("ans-2", "qiq-1")))
        .and(query_param("$select", "GlbAnswerId"))
        .respond_with(results(json!([{ "GlbAnswerId": "ans-2" }])))
        .expect(1)
        .mount(&server)
        .await;

    let answer_id = client(&server)
        .await
        .competitor_answer_id("UsrExternalisationConcurrentConnect", "comp-1", "qiq-1")
        .await
        .unwrap();

    assert_eq!(answer_id.as_deref(), Some("ans-2"));
}

#[tokio::test]
async fn test_satisfaction_answer_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("UsrExternalisationSatisfactionConnectCollection")))
        .and(query_param("$filter", "Id eq guid'sat-1'"))
        .respond_with(results(json!([{ "Name": "Satisfait" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerCollection")))
        .and(query_param("$filter", "Name eq 'Satisfait'"))
        .respond_with(results(json!([{ "Id": "ans-7" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerInQuestionCollection")))
        .and(query_param("$filter", offered_answer_filter("ans-7", "qiq-3")))
        .respond_with(results(json!([{ "GlbAnswerId": "ans-7" }])))
        .mount(&server)
        .await;

    let answer_id = client(&server)
        .await
        .satisfaction_answer_id("sat-1", "qiq-3")
        .await
        .unwrap();

    assert_eq!(answer_id.as_deref(), Some("ans-7"));
}

#[tokio::test]
async fn test_satisfaction_answer_id_for_unknown_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("UsrExternalisationSatisfactionConnectCollection")))
        .respond_with(results(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerCollection")))
        .respond_with(results(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let answer_id = client(&server)
        .await
        .satisfaction_answer_id("missing", "qiq-3")
        .await
        .unwrap();

    assert!(answer_id.is_none());
}

#[tokio::test]
async fn test_satisfaction_answer_in_question_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("UsrExternalisationSatisfactionCollection")))
        .and(query_param("$filter", "Id eq guid'resp-1'"))
        .respond_with(results(json!([{ "Name": "Très satisfait" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerCollection")))
        .and(query_param("$filter", "Name eq 'Très satisfait'"))
        .respond_with(results(json!([{ "Id": "ans-9" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(collection_path("GlbAnswerInQuestionCollection")))
        .and(query_param("$filter", offered_answer_filter("ans-9", "qiq-4")))
        .and(query_param("$select", "Id"))
        .respond_with(results(json!([{ "Id": "aiq-9" }])))
        .expect(1)
        .mount(&server)
        .await;

    let offered = client(&server)
        .await
        .satisfaction_answer_in_question_id("UsrExternalisationSatisfaction", "resp-1", "qiq-4")
        .await
        .unwrap();

    assert_eq!(offered.as_deref(), Some("aiq-9"));
}

#[tokio::test]
async fn test_externalisation_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(collection_path("UsrExternalisationCollection")))
        .and(query_param("$filter", "Id eq guid'ext-1'"))
        .and(query_param("$top", "1"))
        .respond_with(results(json!([{
            "Id": "ext-1",
            "accountId": "a-1",
            "Processed": false,
            "ConcurrentExternalisationConnectId": "comp-1"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server)
        .await
        .externalisation_by_id("ext-1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(record["accountId"], "a-1");
    assert_eq!(record["Processed"], false);
}
