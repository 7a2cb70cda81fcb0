//! Questionnaires, interviews and answers
//!
//! A questionnaire (`GlbQuestionnaire`) links questions through
//! `GlbQuestionInQuestionnaire`, which carries the expected answer type.
//! Each interview (`GlbInterview`) stores one `GlbAnsweredQuestion` per
//! question; multi-choice questions additionally store one
//! `GlbAnsweredChoice` per offered answer (`GlbAnswerInQuestion`).

use chrono::{DateTime, Utc};
use futures::future::try_join;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{dates, deserialize_guid_opt, is_unset, WriteOutcome};
use crate::api::client::CreatioClient;
use crate::api::query::{Filter, OrderBy, QueryBuilder};

pub const QUESTIONNAIRE_COLLECTION: &str = "GlbQuestionnaireCollection";
pub const QUESTIONNAIRE_TYPE_COLLECTION: &str = "GlbQuestionnaireTypeCollection";
pub const INTERVIEW_COLLECTION: &str = "GlbInterviewCollection";
pub const QUESTION_COLLECTION: &str = "GlbQuestionCollection";
pub const QUESTION_IN_QUESTIONNAIRE_COLLECTION: &str = "GlbQuestionInQuestionnaireCollection";
pub const ANSWER_TYPE_COLLECTION: &str = "GlbAnswerTypeCollection";
pub const ANSWER_COLLECTION: &str = "GlbAnswerCollection";
pub const ANSWER_IN_QUESTION_COLLECTION: &str = "GlbAnswerInQuestionCollection";
pub const ANSWERED_QUESTION_COLLECTION: &str = "GlbAnsweredQuestionCollection";
pub const ANSWERED_CHOICE_COLLECTION: &str = "GlbAnsweredChoiceCollection";
pub const OPPORTUNITY_COLLECTION: &str = "OpportunityCollection";
pub const EXTERNALISATION_COLLECTION: &str = "UsrExternalisationCollection";
pub const SATISFACTION_CONNECT_COLLECTION: &str = "UsrExternalisationSatisfactionConnectCollection";

/// Rows per page in [`CreatioClient::interviews_page`]
pub const INTERVIEWS_PER_PAGE: u32 = 20;

/// Display form of a ticked boolean answer
pub const BOOLEAN_TRUE_LABEL: &str = "OUI";

/// Name given to interviews created from an externalisation record
pub const DEFAULT_INTERVIEW_NAME: &str = "Reprise externalisation";

const EXTERNALISATION_FIELDS: &[&str] = &[
    "Id",
    "accountId",
    "Typeprojetexternalisation",
    "CreatedOn",
    "CreatedById",
    "ModifiedOn",
    "ModifiedById",
    "etudieoffre",
    "democheck",
    "note",
    "etatetudieoffre",
    "etatprojetexternalisation",
    "ConcurrentExternalisationConnectId",
    "SousTotalSortantHorsColis",
    "CumulEntrantSortant",
    "TotalEntrant",
    "TotalSortant",
    "VolumeEntrantColis",
    "VolumeEntrantReco",
    "VolumeEntrantSimple",
    "VolumeSortantColis",
    "VolumeSortantReco",
    "VolumeSortantSimple",
    "TypeDestinataireExternalisationId",
    "NombreServicesConnectId",
    "NombreUtilisateursConnectId",
    "UsrExternalisationSatisfactionConnectId",
    "dateFinAbonnementTrackingEntrant",
    "dateFinAbonnementTrackingSortant",
    "multiSiteConnect",
    "dateFinAbonnementConnect",
    "UsrExternalisationSatisfactionTrackingEntrantId",
    "UsrExternalisationSatisfactionTrackingSortantId",
    "ConcurrentExternalisationTrackingEntrantId",
    "ConcurrentExternalisationTrackingSortantId",
    "Notes",
    "methodeEnvoiAffranchiPrestataire",
    "methodeEnvoiAutreMethode",
    "methodeEnvoiEnvoiElectronique",
    "methodeEnvoiExternalisation",
    "methodeEnvoiTimbresMA",
    "NoteConnect",
    "NoteTracking",
    "TotalEntrantPreQualif",
    "TotalSortantPreQualif",
    "Processed",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Questionnaire {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "GlbName", default)]
    pub name: Option<String>,
    #[serde(rename = "GlbQuestionnaireTypeId", default, deserialize_with = "deserialize_guid_opt")]
    pub questionnaire_type_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interview {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "GlbName", default)]
    pub name: Option<String>,
    #[serde(rename = "GlbAccountId", default, deserialize_with = "deserialize_guid_opt")]
    pub account_id: Option<String>,
    #[serde(rename = "GlbContactId", default, deserialize_with = "deserialize_guid_opt")]
    pub contact_id: Option<String>,
    #[serde(rename = "UsrOpportunityId", default, deserialize_with = "deserialize_guid_opt")]
    pub opportunity_id: Option<String>,
    #[serde(rename = "GlbStarted", default)]
    pub started: Option<bool>,
    #[serde(rename = "GlbCompleted", default)]
    pub completed: Option<bool>,
    #[serde(rename = "ModifiedOn", default, deserialize_with = "dates::deserialize_opt")]
    pub modified_on: Option<DateTime<Utc>>,
}

/// An interview with the names of the account and contact it concerns
#[derive(Debug, Clone)]
pub struct InterviewSummary {
    pub interview: Interview,
    pub account_name: Option<String>,
    pub contact_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInQuestionnaire {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "GlbQuestionId", default, deserialize_with = "deserialize_guid_opt")]
    pub question_id: Option<String>,
    #[serde(rename = "GlbAnswerTypeId", default, deserialize_with = "deserialize_guid_opt")]
    pub answer_type_id: Option<String>,
    #[serde(rename = "GlbIsList", default)]
    pub is_list: Option<bool>,
    #[serde(rename = "Position", default)]
    pub position: Option<i64>,
}

/// A question as listed for a questionnaire
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionnaireQuestion {
    /// `GlbQuestion` id
    pub id: String,
    pub questionnaire_id: String,
    pub name: Option<String>,
    pub position: Option<i64>,
    pub answer_type: Option<String>,
}

/// Expected answer of a question, keyed by the `GlbAnswerType` name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerType {
    ChoiceFromList,
    MultiChoice,
    DateTime,
    Date,
    Time,
    Integer,
    Decimal,
    Boolean,
    Text,
}

impl AnswerType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Choice from a list" => Some(Self::ChoiceFromList),
            "Multi choice" => Some(Self::MultiChoice),
            "Date and time" => Some(Self::DateTime),
            "Date" => Some(Self::Date),
            "Time" => Some(Self::Time),
            "Integer" => Some(Self::Integer),
            "Decimal" => Some(Self::Decimal),
            "Boolean" => Some(Self::Boolean),
            "Text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Column of `GlbAnsweredQuestion` holding the answer. Multi-choice
    /// answers live in `GlbAnsweredChoice` instead.
    pub fn answer_field(&self) -> Option<&'static str> {
        match self {
            Self::ChoiceFromList => Some("GlbEnumAnswerId"),
            Self::MultiChoice => None,
            Self::DateTime => Some("GlbDateTimeAnswer"),
            Self::Date => Some("GlbDateAnswer"),
            Self::Time => Some("GlbTimeAnswer"),
            Self::Integer => Some("GlbNumericAnswer"),
            Self::Decimal => Some("GlbDecimalAnswer"),
            Self::Boolean => Some("GlbBooleanAnswer"),
            Self::Text => Some("GlbTextAnswer"),
        }
    }

    /// Display form of a stored answer, `None` when the question was left
    /// unanswered. Unanswered columns hold their type's zero value, so
    /// `false`, `0` and the empty date all read as "no answer".
    /// List choices are ids and are resolved by the caller.
    pub fn render(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (_, Value::Null) => None,
            (Self::Boolean, Value::Bool(true)) => Some(BOOLEAN_TRUE_LABEL.to_string()),
            (Self::Boolean, _) => None,
            (Self::Date | Self::DateTime, Value::String(raw)) => {
                let date = dates::parse(raw).filter(|d| !dates::is_empty_date(d))?;
                let format = if *self == Self::Date { "%d-%m-%Y" } else { "%d-%m-%Y %H:%M" };
                Some(date.format(format).to_string())
            }
            (Self::Integer | Self::Decimal, Value::Number(n)) => {
                (n.as_f64() != Some(0.0)).then(|| n.to_string())
            }
            (Self::Integer | Self::Decimal, Value::String(raw)) => {
                let zero = raw.trim().parse::<f64>().map(|n| n == 0.0).unwrap_or(false);
                (!raw.trim().is_empty() && !zero).then(|| raw.trim().to_string())
            }
            (Self::ChoiceFromList, Value::String(id)) if is_unset(Some(id.as_str())) => None,
            (_, Value::String(raw)) if raw.is_empty() => None,
            (_, Value::String(raw)) => Some(raw.clone()),
            (_, other) => Some(other.to_string()),
        }
    }
}

/// The answers one interview gave to a question
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionAnswer {
    pub interview_id: String,
    /// A single entry except for multi-choice questions
    pub answers: Vec<String>,
    pub account_id: Option<String>,
    pub account_name: Option<String>,
    pub contact_id: Option<String>,
    pub contact_name: Option<String>,
    pub opportunity_id: Option<String>,
    pub opportunity_name: Option<String>,
}

/// Ids resolved from a question name down to the stored answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnsweredQuestionIds {
    pub question_id: Option<String>,
    pub question_in_questionnaire_id: Option<String>,
    pub answered_question_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewInterview {
    pub name: String,
    pub account_id: String,
    /// Kept from the source record, as an OData date string
    pub modified_on: Option<String>,
    pub modified_by_id: Option<String>,
}

impl NewInterview {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_INTERVIEW_NAME.to_string(),
            account_id: account_id.into(),
            modified_on: None,
            modified_by_id: None,
        }
    }

    fn to_body(&self, questionnaire_type_id: &str, questionnaire_id: &str) -> Value {
        let mut body = Map::new();
        body.insert("GlbName".into(), json!(self.name));
        body.insert("GlbQuestionnaireId".into(), json!(questionnaire_id));
        body.insert("GlbQuestionnaireTypeId".into(), json!(questionnaire_type_id));
        body.insert("GlbAccountId".into(), json!(self.account_id));
        body.insert("GlbStarted".into(), json!(true));
        body.insert("GlbCompleted".into(), json!(false));
        if let Some(modified_on) = &self.modified_on {
            body.insert("ModifiedOn".into(), json!(modified_on));
        }
        if let Some(modified_by) = &self.modified_by_id {
            body.insert("ModifiedById".into(), json!(modified_by));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Deserialize)]
struct AnsweredChoice {
    #[serde(rename = "GlbAnswerInQuestionId", default, deserialize_with = "deserialize_guid_opt")]
    answer_in_question_id: Option<String>,
    #[serde(rename = "GlbIsChecked", default)]
    is_checked: bool,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    #[serde(rename = "Id")]
    id: String,
}

impl CreatioClient {
    pub async fn list_questionnaires(&self) -> anyhow::Result<Vec<Questionnaire>> {
        let query = QueryBuilder::new(QUESTIONNAIRE_COLLECTION)
            .select(&["Id", "GlbName"])
            .build();
        self.fetch_all(query).await
    }

    pub async fn questionnaire_by_id(&self, questionnaire_id: &str) -> anyhow::Result<Option<Questionnaire>> {
        let query = QueryBuilder::new(QUESTIONNAIRE_COLLECTION)
            .select(&["Id", "GlbName", "GlbQuestionnaireTypeId"])
            .by_id(questionnaire_id)
            .build();
        self.fetch_first(query).await
    }

    pub async fn questionnaire_interviews(&self, questionnaire_id: &str) -> anyhow::Result<Vec<Interview>> {
        let query = QueryBuilder::new(INTERVIEW_COLLECTION)
            .select(&["Id", "GlbName"])
            .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
            .build();
        self.fetch_all(query).await
    }

    /// One-based page of interviews, most recently modified first
    pub async fn interviews_page(&self, questionnaire_id: &str, page: u32) -> anyhow::Result<Vec<InterviewSummary>> {
        let query = QueryBuilder::new(INTERVIEW_COLLECTION)
            .select(&[
                "Id",
                "GlbAccountId",
                "GlbCompleted",
                "GlbContactId",
                "GlbName",
                "GlbStarted",
                "ModifiedOn",
                "ModifiedBy",
                "UsrOpportunityId",
            ])
            .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
            .newest_first()
            .page(page.saturating_sub(1), INTERVIEWS_PER_PAGE)
            .build();
        let interviews: Vec<Interview> = self.fetch_all(query).await?;

        let mut summaries = Vec::with_capacity(interviews.len());
        for interview in interviews {
            let (account_name, contact_name) = try_join(
                self.optional_name("Account", interview.account_id.as_deref()),
                self.optional_name("Contact", interview.contact_id.as_deref()),
            )
            .await?;
            summaries.push(InterviewSummary {
                interview,
                account_name,
                contact_name,
            });
        }
        Ok(summaries)
    }

    /// Questions of a questionnaire in display order
    pub async fn questionnaire_questions(&self, questionnaire_id: &str) -> anyhow::Result<Vec<QuestionnaireQuestion>> {
        let query = QueryBuilder::new(QUESTION_IN_QUESTIONNAIRE_COLLECTION)
            .select(&["Id", "GlbQuestionId", "Position", "GlbAnswerTypeId"])
            .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
            .orderby(OrderBy::asc("Position"))
            .build();
        let links: Vec<QuestionInQuestionnaire> = self.fetch_all(query).await?;

        let mut questions = Vec::with_capacity(links.len());
        for link in links {
            let Some(question_id) = link.question_id else {
                continue;
            };
            let answer_type = match &link.answer_type_id {
                Some(id) => self.answer_type_name(id).await?,
                None => None,
            };
            let name = self.lookup_name("GlbQuestion", &question_id).await?;
            questions.push(QuestionnaireQuestion {
                id: question_id,
                questionnaire_id: questionnaire_id.to_string(),
                name,
                position: link.position,
                answer_type,
            });
        }
        Ok(questions)
    }

    pub async fn question_in_questionnaire(
        &self,
        question_id: &str,
        questionnaire_id: &str,
    ) -> anyhow::Result<Option<QuestionInQuestionnaire>> {
        let query = QueryBuilder::new(QUESTION_IN_QUESTIONNAIRE_COLLECTION)
            .select(&["Id", "GlbAnswerTypeId", "GlbIsList"])
            .filter(Filter::guid("GlbQuestion/Id", question_id))
            .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
            .build();
        self.fetch_first(query).await
    }

    pub async fn answer_type_name(&self, answer_type_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_field(QueryBuilder::new(ANSWER_TYPE_COLLECTION).by_id(answer_type_id), "Name")
            .await
    }

    /// Every interview's answer to a question, with the account, contact
    /// and opportunity the interview concerns
    pub async fn question_answers(&self, question_id: &str, questionnaire_id: &str) -> anyhow::Result<Vec<QuestionAnswer>> {
        let Some(link) = self.question_in_questionnaire(question_id, questionnaire_id).await? else {
            debug!("Question {} is not part of questionnaire {}", question_id, questionnaire_id);
            return Ok(Vec::new());
        };

        let type_name = match &link.answer_type_id {
            Some(id) => self.answer_type_name(id).await?,
            None => None,
        };
        let answer_type = type_name
            .as_deref()
            .and_then(AnswerType::from_name)
            .ok_or_else(|| anyhow::anyhow!("Unsupported answer type {:?} for question {}", type_name, question_id))?;

        match answer_type.answer_field() {
            Some(field) => self.single_answers(&link.id, answer_type, field).await,
            None => self.multi_choice_answers(&link.id, questionnaire_id).await,
        }
    }

    async fn single_answers(
        &self,
        question_in_questionnaire_id: &str,
        answer_type: AnswerType,
        field: &str,
    ) -> anyhow::Result<Vec<QuestionAnswer>> {
        let query = QueryBuilder::new(ANSWERED_QUESTION_COLLECTION)
            .select(&[field, "GlbInterviewId"])
            .filter(Filter::guid("GlbQuestionInQuestionnaire/Id", question_in_questionnaire_id))
            .build();
        let rows: Vec<Value> = self.fetch_all(query).await?;

        let mut answers = Vec::new();
        for row in rows {
            let Some(mut answer) = row.get(field).and_then(|v| answer_type.render(v)) else {
                continue;
            };
            if answer_type == AnswerType::ChoiceFromList {
                match self.lookup_name("GlbAnswer", &answer).await? {
                    Some(name) => answer = name,
                    None => continue,
                }
            }

            let Some(interview_id) = row.get("GlbInterviewId").and_then(|v| v.as_str()) else {
                continue;
            };
            let mut entry = self.interview_context(interview_id).await?;
            entry.answers.push(answer);
            answers.push(entry);
        }
        Ok(answers)
    }

    async fn multi_choice_answers(
        &self,
        question_in_questionnaire_id: &str,
        questionnaire_id: &str,
    ) -> anyhow::Result<Vec<QuestionAnswer>> {
        let mut answers = Vec::new();

        for interview in self.questionnaire_interviews(questionnaire_id).await? {
            let Some(answered_question_id) = self
                .answered_question_id(question_in_questionnaire_id, &interview.id)
                .await?
            else {
                continue;
            };

            let query = QueryBuilder::new(ANSWERED_CHOICE_COLLECTION)
                .select(&["Id", "GlbAnswerInQuestionId", "GlbIsChecked"])
                .filter(Filter::guid("GlbAnsweredQuestion/Id", &answered_question_id))
                .filter(Filter::guid("GlbInterview/Id", &interview.id))
                .build();
            let choices: Vec<AnsweredChoice> = self.fetch_all(query).await?;

            let mut checked = Vec::new();
            for choice in choices.iter().filter(|c| c.is_checked) {
                let Some(answer_in_question_id) = &choice.answer_in_question_id else {
                    continue;
                };
                let answer_id = self
                    .fetch_field(
                        QueryBuilder::new(ANSWER_IN_QUESTION_COLLECTION).by_id(answer_in_question_id.as_str()),
                        "GlbAnswerId",
                    )
                    .await?;
                if let Some(name) = self.optional_name("GlbAnswer", answer_id.as_deref()).await? {
                    checked.push(name);
                }
            }
            if checked.is_empty() {
                continue;
            }

            let mut entry = self.interview_context(&interview.id).await?;
            entry.answers = checked;
            answers.push(entry);
        }
        Ok(answers)
    }

    /// Account, contact and opportunity of an interview, names resolved
    async fn interview_context(&self, interview_id: &str) -> anyhow::Result<QuestionAnswer> {
        let query = QueryBuilder::new(INTERVIEW_COLLECTION)
            .select(&["Id", "GlbName", "GlbAccountId", "GlbContactId", "UsrOpportunityId"])
            .by_id(interview_id)
            .build();
        let interview: Option<Interview> = self.fetch_first(query).await?;

        let mut entry = QuestionAnswer {
            interview_id: interview_id.to_string(),
            ..QuestionAnswer::default()
        };
        let Some(interview) = interview else {
            warn!("Interview {} not found", interview_id);
            return Ok(entry);
        };

        let (account_name, contact_name) = try_join(
            self.optional_name("Account", interview.account_id.as_deref()),
            self.optional_name("Contact", interview.contact_id.as_deref()),
        )
        .await?;
        entry.account_name = account_name;
        entry.contact_name = contact_name;
        entry.opportunity_name = match &interview.opportunity_id {
            Some(id) => {
                self.fetch_field(QueryBuilder::new(OPPORTUNITY_COLLECTION).by_id(id.as_str()), "Title")
                    .await?
            }
            None => None,
        };
        entry.account_id = interview.account_id;
        entry.contact_id = interview.contact_id;
        entry.opportunity_id = interview.opportunity_id;
        Ok(entry)
    }

    async fn optional_name(&self, object: &str, id: Option<&str>) -> anyhow::Result<Option<String>> {
        match id {
            Some(id) if !is_unset(Some(id)) => self.lookup_name(object, id).await,
            _ => Ok(None),
        }
    }

    pub async fn create_interview(
        &self,
        questionnaire_type_id: &str,
        questionnaire_id: &str,
        interview: &NewInterview,
    ) -> anyhow::Result<WriteOutcome> {
        let body = interview.to_body(questionnaire_type_id, questionnaire_id);
        self.create_record(INTERVIEW_COLLECTION, &body).await
    }

    /// One empty `GlbAnsweredQuestion` per question of the questionnaire
    pub async fn insert_empty_answered_questions(
        &self,
        questionnaire_id: &str,
        interview_id: &str,
    ) -> anyhow::Result<Vec<WriteOutcome>> {
        let query = QueryBuilder::new(QUESTION_IN_QUESTIONNAIRE_COLLECTION)
            .select(&["Id"])
            .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
            .build();
        let links: Vec<IdRow> = self.fetch_all(query).await?;

        let mut outcomes = Vec::with_capacity(links.len());
        for link in links {
            let body = json!({
                "GlbQuestionInQuestionnaireId": link.id,
                "GlbInterviewId": interview_id,
            });
            let outcome = self.create_record(ANSWERED_QUESTION_COLLECTION, &body).await?;
            if !outcome.ok {
                warn!(
                    "Could not create answer slot for question {}: {}",
                    link.id,
                    outcome.message.as_deref().unwrap_or_default()
                );
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Resolve question name -> question -> question in questionnaire ->
    /// stored answer of the interview. Stops at the first missing link.
    pub async fn answered_question_ids(
        &self,
        question_name: &str,
        questionnaire_id: &str,
        interview_id: &str,
    ) -> anyhow::Result<AnsweredQuestionIds> {
        let mut ids = AnsweredQuestionIds::default();

        ids.question_id = self.question_id_by_name(question_name).await?;
        let Some(question_id) = &ids.question_id else {
            return Ok(ids);
        };

        ids.question_in_questionnaire_id = self
            .fetch_id(
                QueryBuilder::new(QUESTION_IN_QUESTIONNAIRE_COLLECTION)
                    .filter(Filter::guid("GlbQuestionnaire/Id", questionnaire_id))
                    .filter(Filter::guid("GlbQuestion/Id", question_id.as_str())),
            )
            .await?;
        let Some(link_id) = &ids.question_in_questionnaire_id else {
            return Ok(ids);
        };

        ids.answered_question_id = self.answered_question_id(link_id, interview_id).await?;
        Ok(ids)
    }

    async fn answered_question_id(
        &self,
        question_in_questionnaire_id: &str,
        interview_id: &str,
    ) -> anyhow::Result<Option<String>> {
        self.fetch_id(
            QueryBuilder::new(ANSWERED_QUESTION_COLLECTION)
                .filter(Filter::guid("GlbQuestionInQuestionnaire/Id", question_in_questionnaire_id))
                .filter(Filter::guid("GlbInterview/Id", interview_id)),
        )
        .await
    }

    /// Store `value` in one answer column (see [`AnswerType::answer_field`])
    pub async fn update_answered_question(
        &self,
        answered_question_id: &str,
        field: &str,
        value: Value,
    ) -> anyhow::Result<WriteOutcome> {
        let mut body = Map::new();
        body.insert("Id".into(), json!(answered_question_id));
        body.insert(field.to_string(), value);
        self.update_record(ANSWERED_QUESTION_COLLECTION, answered_question_id, &Value::Object(body))
            .await
    }

    /// Id of the offered answer named `answer_name` within one question of a questionnaire
    pub async fn answer_in_question_id(
        &self,
        answer_name: &str,
        question_in_questionnaire_id: &str,
    ) -> anyhow::Result<Option<String>> {
        self.answer_in_question_field(answer_name, question_in_questionnaire_id, "Id")
            .await
    }

    /// `GlbAnswer` id matching the name of a competitor record.
    ///
    /// `object` is the object or collection holding the competitor, e.g.
    /// `UsrExternalisationConcurrentConnect`.
    pub async fn competitor_answer_id(
        &self,
        object: &str,
        competitor_id: &str,
        question_in_questionnaire_id: &str,
    ) -> anyhow::Result<Option<String>> {
        self.answer_id_for_record(object, competitor_id, question_in_questionnaire_id)
            .await
    }

    /// `GlbAnswer` id matching an externalisation satisfaction level
    pub async fn satisfaction_answer_id(
        &self,
        satisfaction_id: &str,
        question_in_questionnaire_id: &str,
    ) -> anyhow::Result<Option<String>> {
        self.answer_id_for_record(SATISFACTION_CONNECT_COLLECTION, satisfaction_id, question_in_questionnaire_id)
            .await
    }

    /// Offered answer (`GlbAnswerInQuestion` id) named like the record `answer_id` of `object`
    pub async fn satisfaction_answer_in_question_id(
        &self,
        object: &str,
        answer_id: &str,
        question_in_questionnaire_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let Some(name) = self.lookup_name(object, answer_id).await? else {
            debug!("No {} record {}", object, answer_id);
            return Ok(None);
        };
        self.answer_in_question_id(&name, question_in_questionnaire_id).await
    }

    async fn answer_id_for_record(
        &self,
        object: &str,
        record_id: &str,
        question_in_questionnaire_id: &str,
    ) -> anyhow::Result<Option<String>> {
        let Some(name) = self.lookup_name(object, record_id).await? else {
            debug!("No {} record {}", object, record_id);
            return Ok(None);
        };
        self.answer_in_question_field(&name, question_in_questionnaire_id, "GlbAnswerId")
            .await
    }

    /// `field` of the first `GlbAnswerInQuestion` row offering an answer named `answer_name`
    async fn answer_in_question_field(
        &self,
        answer_name: &str,
        question_in_questionnaire_id: &str,
        field: &str,
    ) -> anyhow::Result<Option<String>> {
        let query = QueryBuilder::new(ANSWER_COLLECTION)
            .select(&["Id"])
            .filter(Filter::eq("Name", answer_name))
            .build();
        let candidates: Vec<IdRow> = self.fetch_all(query).await?;

        for answer in candidates {
            let value = self
                .fetch_field(
                    QueryBuilder::new(ANSWER_IN_QUESTION_COLLECTION)
                        .filter(Filter::guid("GlbAnswer/Id", answer.id))
                        .filter(Filter::guid("GlbQuestionInQuestionnaire/Id", question_in_questionnaire_id)),
                    field,
                )
                .await?;
            if value.is_some() {
                return Ok(value);
            }
        }
        Ok(None)
    }

    /// Tick a multi-choice answer, creating the choice row when missing
    pub async fn upsert_answered_choice(
        &self,
        answer_in_question_id: &str,
        answered_question_id: &str,
        interview_id: &str,
    ) -> anyhow::Result<WriteOutcome> {
        let existing = self
            .fetch_id(
                QueryBuilder::new(ANSWERED_CHOICE_COLLECTION)
                    .filter(Filter::guid("GlbInterview/Id", interview_id))
                    .filter(Filter::guid("GlbAnsweredQuestion/Id", answered_question_id))
                    .filter(Filter::guid("GlbAnswerInQuestion/Id", answer_in_question_id)),
            )
            .await?;

        match existing {
            Some(choice_id) => {
                self.update_record(ANSWERED_CHOICE_COLLECTION, &choice_id, &json!({ "GlbIsChecked": true }))
                    .await
            }
            None => {
                let body = json!({
                    "GlbAnswerInQuestionId": answer_in_question_id,
                    "GlbAnsweredQuestionId": answered_question_id,
                    "GlbInterviewId": interview_id,
                    "GlbIsChecked": true,
                });
                self.create_record(ANSWERED_CHOICE_COLLECTION, &body).await
            }
        }
    }

    pub async fn questionnaire_type_id(&self, type_name: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(QueryBuilder::new(QUESTIONNAIRE_TYPE_COLLECTION).filter(Filter::eq("Name", type_name)))
            .await
    }

    pub async fn questionnaire_id(&self, name: &str, questionnaire_type_id: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(
            QueryBuilder::new(QUESTIONNAIRE_COLLECTION)
                .filter(Filter::eq("GlbName", name))
                .filter(Filter::guid("GlbQuestionnaireType/Id", questionnaire_type_id)),
        )
        .await
    }

    pub async fn question_id_by_name(&self, name: &str) -> anyhow::Result<Option<String>> {
        self.fetch_id(QueryBuilder::new(QUESTION_COLLECTION).filter(Filter::eq("Name", name)))
            .await
    }

    /// One externalisation record with every field used to build an interview
    pub async fn externalisation_by_id(&self, externalisation_id: &str) -> anyhow::Result<Option<Value>> {
        let query = QueryBuilder::new(EXTERNALISATION_COLLECTION)
            .select(EXTERNALISATION_FIELDS)
            .by_id(externalisation_id)
            .build();
        self.fetch_first(query).await
    }

    /// Externalisation records not yet turned into interviews
    pub async fn pending_externalisations(&self, limit: u32) -> anyhow::Result<Vec<Value>> {
        let query = QueryBuilder::new(EXTERNALISATION_COLLECTION)
            .select(EXTERNALISATION_FIELDS)
            .filter(Filter::eq("Processed", false))
            .top(limit)
            .build();
        self.fetch_all(query).await
    }

    pub async fn mark_externalisation_processed(&self, externalisation_id: &str) -> anyhow::Result<WriteOutcome> {
        self.update_record(EXTERNALISATION_COLLECTION, externalisation_id, &json!({ "Processed": true }))
            .await
    }
}
