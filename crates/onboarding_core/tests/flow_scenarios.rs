mod common;

use common::{Harness, MemoryStore, StubValidator};
use onboarding_core::{
    AiReply, CompletionStatus, DataField, FlowState, InputModality, OnboardingData, ProcessStage,
    ResponseMode, Speaker, TurnOutcome,
};

const ANSWERS: [&str; 6] = [
    "My name is John",
    "I work for Heineken",
    "I'm a manager",
    "Grow sales",
    "yes",
    "A dashboard",
];

fn reply(response: &str, extracted: OnboardingData, is_complete: bool) -> AiReply {
    AiReply {
        response: response.to_string(),
        extracted_data: extracted,
        is_complete,
        usage: None,
    }
}

#[tokio::test]
async fn simple_mode_happy_path_produces_complete_report() {
    let harness = Harness::new();
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Text);
    flow.start_session().await.unwrap();

    let mut outcome = TurnOutcome::AwaitingInput;
    for answer in ANSWERS {
        outcome = flow.handle_user_turn(InputModality::Text, answer).await.unwrap();
    }

    let TurnOutcome::Completed(report) = outcome else {
        panic!("expected the last answer to complete the session");
    };
    assert_eq!(report.completion_status, CompletionStatus::Complete);
    assert_eq!(report.user_data.user_name.as_deref(), Some("John"));
    assert_eq!(report.user_data.company_name.as_deref(), Some("Heineken"));
    assert_eq!(report.user_data.role.as_deref(), Some("manager"));
    assert_eq!(report.user_data.industry_confirmed, Some(true));
    assert_eq!(report.user_data.ideal_output.as_deref(), Some("A dashboard"));
    assert!(report.validation_result.as_ref().unwrap().industry_match);

    // Validation ran at the industry question and was not repeated at completion.
    assert_eq!(harness.validator.call_count(), 1);
    assert_eq!(harness.store.count(), 1);
    assert_eq!(flow.stage(), ProcessStage::Complete);

    // Opening prompt, five full exchanges, the validation summary and the last answer with its follow-up.
    assert_eq!(report.transcript.len(), 19);
    let turns = flow.conversation().all();
    assert_eq!(turns.len(), 20);
    let closing = turns.last().unwrap();
    assert_eq!(closing.speaker, Speaker::Agent);
    assert_eq!(closing.text, "Great, I have all the details I need.");
}

#[tokio::test]
async fn simple_mode_fills_prompt_placeholders() {
    let harness = Harness::new();
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Text);
    flow.start_session().await.unwrap();

    flow.handle_user_turn(InputModality::Text, ANSWERS[0]).await.unwrap();
    flow.handle_user_turn(InputModality::Text, ANSWERS[1]).await.unwrap();

    let texts: Vec<&str> = flow.conversation().all().iter().map(|t| t.text.as_str()).collect();
    assert!(texts.contains(&"Nice to meet you, John!"));
    assert!(texts.contains(&"What is your role at Heineken?"));
}

#[tokio::test]
async fn ai_failure_falls_back_to_slot_filling() {
    let harness = Harness::new();
    harness.ai.push_failure("connection reset");
    let mut flow = harness.controller(ResponseMode::Ai, InputModality::Text);
    flow.start_session().await.unwrap();

    let outcome = flow.handle_user_turn(InputModality::Text, "My name is John").await.unwrap();

    assert_eq!(outcome, TurnOutcome::AwaitingInput);
    assert_eq!(harness.ai.calls(), 1);
    assert_eq!(flow.data().user_name.as_deref(), Some("John"));

    let turns = flow.conversation().all();
    let user_index = turns.iter().position(|t| t.speaker == Speaker::User).unwrap();
    let after_user = &turns[user_index + 1..];
    assert_eq!(after_user[0].speaker, Speaker::Agent);
    assert_eq!(after_user[0].text, "Nice to meet you, John!");
    let follow_ups = after_user
        .iter()
        .filter(|t| t.text.starts_with("Nice to meet you"))
        .count();
    assert_eq!(follow_ups, 1);
    assert_eq!(flow.state(), FlowState::AwaitingUserInput);
    assert!(!flow.is_processing());
}

#[tokio::test]
async fn fallback_never_re_asks_collected_fields() {
    let harness = Harness::new();
    harness.ai.push_reply(reply(
        "Thanks John! What is your role at Glanbia?",
        OnboardingData::new()
            .with(DataField::UserName, "John")
            .with(DataField::CompanyName, "Glanbia"),
        false,
    ));
    harness.ai.push_failure("timeout");
    let mut flow = harness.controller(ResponseMode::Ai, InputModality::Text);
    flow.start_session().await.unwrap();

    flow.handle_user_turn(InputModality::Text, "I'm John from Glanbia").await.unwrap();
    assert_eq!(flow.current_step(), 2);
    let mark = flow.conversation().len();

    flow.handle_user_turn(InputModality::Text, "I'm a buyer").await.unwrap();

    assert_eq!(flow.data().user_name.as_deref(), Some("John"));
    assert_eq!(flow.data().company_name.as_deref(), Some("Glanbia"));
    assert_eq!(flow.data().role.as_deref(), Some("buyer"));
    let new_turns: Vec<&str> = flow.conversation().since(mark).iter().map(|t| t.text.as_str()).collect();
    assert_eq!(
        new_turns,
        vec![
            "I'm a buyer",
            "Great, so you work as buyer.",
            "What are you hoping to achieve with our research?",
        ]
    );
}

#[tokio::test]
async fn ai_reply_is_spoken_and_listening_resumes() {
    let harness = Harness::new();
    harness.ai.push_reply(reply(
        "Nice to meet you John. Which company do you work for?",
        OnboardingData::new().with(DataField::UserName, "John"),
        false,
    ));
    let mut flow = harness.controller(ResponseMode::Ai, InputModality::Audio);
    flow.start_session().await.unwrap();
    assert!(*harness.speech.listening.lock().unwrap());

    flow.handle_user_turn(InputModality::Audio, "I'm John").await.unwrap();

    let last = flow.conversation().last().unwrap();
    assert_eq!(last.speaker, Speaker::Agent);
    assert_eq!(last.input_modality, InputModality::Audio);
    assert_eq!(flow.current_step(), 1);
    assert_eq!(*harness.speech.listen_requests.lock().unwrap(), 2);
    assert!(*harness.speech.listening.lock().unwrap());

    let context = harness.ai.contexts.lock().unwrap()[0].clone();
    assert_eq!(context.current_focus, Some(DataField::UserName));
    assert_eq!(context.missing_fields.len(), 6);
    assert_eq!(context.conversation_history.len(), 2);

    let spoken = harness.speech.spoken.lock().unwrap();
    let agent_turns: Vec<&String> = flow
        .conversation()
        .all()
        .iter()
        .filter(|t| t.speaker == Speaker::Agent)
        .map(|t| &t.text)
        .collect();
    assert_eq!(spoken.iter().collect::<Vec<_>>(), agent_turns);
}

#[tokio::test]
async fn empty_ai_reply_asks_for_the_next_open_field() {
    let harness = Harness::new();
    harness.ai.push_reply(reply(
        "",
        OnboardingData::new().with(DataField::UserName, "John"),
        false,
    ));
    let mut flow = harness.controller(ResponseMode::Ai, InputModality::Audio);
    flow.start_session().await.unwrap();

    let outcome = flow.handle_user_turn(InputModality::Audio, "I'm John").await.unwrap();

    assert!(matches!(outcome, TurnOutcome::AwaitingInput));
    let last = flow.conversation().last().unwrap();
    assert_eq!(last.speaker, Speaker::Agent);
    assert_eq!(last.text, "Which company do you work for?");
    assert_eq!(*harness.speech.listen_requests.lock().unwrap(), 2);
    assert!(*harness.speech.listening.lock().unwrap());
    assert_eq!(
        harness.speech.spoken.lock().unwrap().last().map(String::as_str),
        Some("Which company do you work for?")
    );
}

#[tokio::test]
async fn ai_completion_flag_completes_like_simple_mode() {
    let harness = Harness::new();
    let everything = OnboardingData::new()
        .with(DataField::UserName, "Sarah")
        .with(DataField::CompanyName, "Musgrave")
        .with(DataField::Role, "Category Manager")
        .with(DataField::Objective, "Understand shopper trends")
        .with(DataField::IndustryConfirmed, true)
        .with(DataField::IdealOutput, "A quarterly briefing");
    harness.ai.push_reply(reply("Thanks, that's everything.", everything, true));
    let mut flow = harness.controller(ResponseMode::Ai, InputModality::Text);
    flow.start_session().await.unwrap();

    let outcome = flow
        .handle_user_turn(InputModality::Text, "I'm Sarah, a category manager at Musgrave...")
        .await
        .unwrap();

    let TurnOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(report.completion_status, CompletionStatus::Complete);
    assert!(report.transcript.len() >= 2);
    assert_eq!(report.user_data.filled_count(), 6);
    assert_eq!(report.validation_result.as_ref().map(|v| v.industry_match), Some(true));
    assert_eq!(harness.validator.call_count(), 1);
    assert_eq!(flow.state(), FlowState::Complete);
    assert!(flow.handle_user_turn(InputModality::Text, "hello?").await.is_err());
}

#[tokio::test]
async fn unknown_company_still_completes() {
    let harness = Harness::new();
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Text);
    flow.start_session().await.unwrap();

    let answers = ["Aoife", "Unknown Co", "Analyst", "Benchmarking", "no", "A report"];
    let mut outcome = TurnOutcome::AwaitingInput;
    for answer in answers {
        outcome = flow.handle_user_turn(InputModality::Text, answer).await.unwrap();
    }

    let TurnOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    let validation = report.validation_result.unwrap();
    assert!(!validation.industry_match);
    assert_eq!(
        validation.company_overview,
        "This company is not recognised in our food and beverage group."
    );
    assert_eq!(report.completion_status, CompletionStatus::Complete);
    assert_eq!(report.user_data.industry_confirmed, Some(false));
}

#[tokio::test]
async fn validator_failure_is_not_fatal() {
    let harness = Harness::with(StubValidator::failing(), MemoryStore::default());
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Text);
    flow.start_session().await.unwrap();

    let mut outcome = TurnOutcome::AwaitingInput;
    for answer in ANSWERS {
        outcome = flow.handle_user_turn(InputModality::Text, answer).await.unwrap();
    }

    let TurnOutcome::Completed(report) = outcome else {
        panic!("expected completion");
    };
    let validation = report.validation_result.unwrap();
    assert!(!validation.industry_match);
    assert_eq!(validation.company_overview, "Company overview not found.");
    assert_eq!(harness.validator.call_count(), 1);
}

#[tokio::test]
async fn persistence_failure_still_returns_report() {
    let harness = Harness::with(StubValidator::known(&["heineken"]), MemoryStore::failing());
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Text);
    flow.start_session().await.unwrap();

    let mut outcome = TurnOutcome::AwaitingInput;
    for answer in ANSWERS {
        outcome = flow.handle_user_turn(InputModality::Text, answer).await.unwrap();
    }

    assert!(matches!(outcome, TurnOutcome::Completed(_)));
    assert_eq!(harness.store.count(), 0);
    assert!(flow.report().is_some());
    assert_eq!(flow.stage(), ProcessStage::Complete);
}

#[tokio::test]
async fn restart_after_completion_clears_session() {
    let harness = Harness::new();
    let mut flow = harness.controller(ResponseMode::Simple, InputModality::Audio);
    flow.start_session().await.unwrap();
    for answer in ANSWERS {
        flow.handle_user_turn(InputModality::Audio, answer).await.unwrap();
    }
    assert_eq!(flow.stage(), ProcessStage::Complete);

    flow.restart_session().await;

    assert!(flow.conversation().is_empty());
    assert_eq!(flow.data(), &OnboardingData::new());
    assert_eq!(flow.stage(), ProcessStage::Landing);
    assert_eq!(flow.current_step(), 0);
    assert!(flow.validation_result().is_none());
    assert!(flow.report().is_none());
    assert!(*harness.speech.cancels.lock().unwrap() >= 1);
    assert!(!*harness.speech.listening.lock().unwrap());

    flow.start_session().await.unwrap();
    assert_eq!(flow.conversation().len(), 1);
}
