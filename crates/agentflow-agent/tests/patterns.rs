use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use agentflow_agent::evaluator::{self, EvaluatorOptions, build_evaluator_optimizer};
use agentflow_agent::orchestrator::{self, build_orchestrator_worker};
use agentflow_agent::parallel::{self, build_parallel};
use agentflow_agent::prompt_chain::{self, build_prompt_chain};
use agentflow_agent::routing::{self, build_router};
use agentflow_core::config::RunnableConfig;
use agentflow_core::error::{FlowError, GraphError, ModelError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel, ChatResult};
use agentflow_core::runnable::Runnable;
use agentflow_llm::scripted::ScriptedChatModel;

fn config() -> RunnableConfig {
    RunnableConfig::default()
}

fn last_text(messages: &[Message]) -> String {
    messages
        .last()
        .map(|m| m.content().to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Prompt chaining
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gate_passes_and_stops_after_generate() {
    let model = Arc::new(ScriptedChatModel::new([Message::ai("Cats are great")]));
    let graph = build_prompt_chain(model.clone()).unwrap();

    let state = graph.invoke(json!({"topic": "cats"}), &config()).await.unwrap();

    assert_eq!(state["joke"], "Cats are great");
    assert!(state.get("improved_joke").is_none());
    assert!(state.get("final_joke").is_none());
    assert_eq!(model.call_count(), 1);
    assert_eq!(
        model.requests()[0][0].content(),
        "Write a short joke about cats"
    );
}

#[tokio::test]
async fn gate_fails_and_runs_improve_then_polish() {
    let model = Arc::new(ScriptedChatModel::new([
        Message::ai("Why did the cat sit on the laptop?"),
        Message::ai("improved"),
        Message::ai("polished"),
    ]));
    let graph = build_prompt_chain(model.clone()).unwrap();
    let steps = Mutex::new(Vec::new());

    let state = graph
        .invoke_with_observer(json!({"topic": "cats"}), &config(), |info| {
            steps.lock().unwrap().push(info.node.clone())
        })
        .await
        .unwrap();

    assert_eq!(state["improved_joke"], "improved");
    assert_eq!(state["final_joke"], "polished");
    assert_eq!(
        *steps.lock().unwrap(),
        vec![prompt_chain::GENERATE, prompt_chain::IMPROVE, prompt_chain::POLISH]
    );
    assert!(model.requests()[2][0].content().ends_with("improved"));
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

fn routing_model(step: &'static str) -> ScriptedChatModel {
    ScriptedChatModel::from_fn(move |messages, options| {
        if options.response_format.is_some() {
            Ok(Message::ai(json!({"step": step}).to_string()))
        } else {
            Ok(Message::ai(format!("{step}: {}", last_text(messages))))
        }
    })
}

#[tokio::test]
async fn router_dispatches_on_structured_decision() {
    let graph = build_router(Arc::new(routing_model("joke"))).unwrap();
    let steps = Mutex::new(Vec::new());

    let state = graph
        .invoke_with_observer(
            json!({"input": "Write me a joke about cats"}),
            &config(),
            |info| steps.lock().unwrap().push(info.node.clone()),
        )
        .await
        .unwrap();

    assert_eq!(state["decision"], "joke");
    assert_eq!(state["output"], "joke: Write me a joke about cats");
    assert_eq!(*steps.lock().unwrap(), vec![routing::ROUTER, routing::JOKE]);
}

#[tokio::test]
async fn unparseable_route_fails_in_router_node() {
    let model = Arc::new(ScriptedChatModel::new([Message::ai("a limerick, please")]));
    let graph = build_router(model).unwrap();

    let err = graph
        .invoke(json!({"input": "Write me a limerick"}), &config())
        .await
        .unwrap_err();

    match err {
        FlowError::Graph(GraphError::Run { node, source, .. }) => {
            assert_eq!(node, routing::ROUTER);
            assert!(matches!(*source, FlowError::Model(ModelError::InvalidResponse(_))));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Parallelization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn writers_fan_out_and_aggregator_joins_once() {
    let model = Arc::new(ScriptedChatModel::from_fn(|messages, _| {
        Ok(Message::ai(last_text(messages).replace("Write a ", "")))
    }));
    let graph = build_parallel(model.clone()).unwrap();
    let steps = Mutex::new(Vec::new());

    let state = graph
        .invoke_with_observer(json!({"topic": "cats"}), &config(), |info| {
            steps.lock().unwrap().push((info.step, info.node.clone()))
        })
        .await
        .unwrap();

    assert_eq!(
        state["combined_output"],
        parallel::combine_outputs("cats", "story about cats", "joke about cats", "poem about cats")
    );
    assert_eq!(model.call_count(), 3);

    let steps = steps.lock().unwrap();
    assert_eq!(steps.len(), 4);
    let writer_steps: Vec<usize> = steps
        .iter()
        .filter(|(_, node)| node != parallel::AGGREGATOR)
        .map(|(step, _)| *step)
        .collect();
    assert!(writer_steps.iter().all(|s| *s == writer_steps[0]));
    assert_eq!(steps[3].1, parallel::AGGREGATOR);
}

// ---------------------------------------------------------------------------
// Orchestrator-worker
// ---------------------------------------------------------------------------

/// Plans three sections; the writer for an earlier section takes longer, so
/// workers complete in reverse plan order.
struct ReportModel;

#[async_trait]
impl ChatModel for ReportModel {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let content = if options.response_format.is_some() {
            json!({"sections": [
                {"name": "Intro", "description": "why scaling laws matter"},
                {"name": "Body", "description": "the power laws"},
                {"name": "Conclusion", "description": "what comes next"}
            ]})
            .to_string()
        } else {
            let request = last_text(messages);
            let (name, delay) = if request.contains("Intro") {
                ("Intro", 60)
            } else if request.contains("Body") {
                ("Body", 30)
            } else {
                ("Conclusion", 0)
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            format!("## {name}")
        };
        Ok(ChatResult {
            message: Message::ai(content),
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        "report"
    }
}

#[tokio::test]
async fn sections_join_in_plan_order_regardless_of_completion() {
    let graph = build_orchestrator_worker(Arc::new(ReportModel)).unwrap();
    let finished = Mutex::new(Vec::new());

    let state = graph
        .invoke_with_observer(
            json!({"topic": "Create a report on LLM scaling laws"}),
            &config(),
            |info| {
                if info.node == orchestrator::WORKER {
                    let content = &info.update["completed_sections"][0]["content"];
                    finished.lock().unwrap().push(content.clone());
                }
            },
        )
        .await
        .unwrap();

    assert_eq!(
        *finished.lock().unwrap(),
        vec![json!("## Conclusion"), json!("## Body"), json!("## Intro")]
    );
    assert_eq!(
        state["final_report"],
        ["## Intro", "## Body", "## Conclusion"].join(orchestrator::SECTION_SEPARATOR)
    );
    assert_eq!(state["completed_sections"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn empty_plan_still_produces_a_report() {
    let model = Arc::new(ScriptedChatModel::new([Message::ai(r#"{"sections": []}"#)]));
    let graph = build_orchestrator_worker(model).unwrap();

    let state = graph.invoke(json!({"topic": "nothing"}), &config()).await.unwrap();
    assert_eq!(state["final_report"], "");
}

// ---------------------------------------------------------------------------
// Evaluator-optimizer
// ---------------------------------------------------------------------------

fn grading_model(grades: Vec<&'static str>) -> ScriptedChatModel {
    let grades = Mutex::new(grades.into_iter());
    ScriptedChatModel::from_fn(move |messages, options| {
        if options.response_format.is_some() {
            let grade = grades.lock().unwrap().next().unwrap_or("not funny");
            Ok(Message::ai(
                json!({"grade": grade, "feedback": "needs a pun"}).to_string(),
            ))
        } else {
            Ok(Message::ai(format!("joke #{}", messages.len())))
        }
    })
}

fn generator_prompts(model: &ScriptedChatModel) -> Vec<String> {
    model
        .requests()
        .iter()
        .map(|r| last_text(r))
        .filter(|t| t.starts_with("Write a joke"))
        .collect()
}

#[tokio::test]
async fn rejected_joke_is_rewritten_with_feedback() {
    let model = Arc::new(grading_model(vec!["not funny", "funny"]));
    let graph = build_evaluator_optimizer(model.clone(), EvaluatorOptions::default()).unwrap();

    let state = graph.invoke(json!({"topic": "Cats"}), &config()).await.unwrap();

    assert_eq!(state["funny_or_not"], "funny");
    assert_eq!(state["rounds"], 2);
    let prompts = generator_prompts(&model);
    assert_eq!(prompts[0], "Write a joke about Cats");
    assert_eq!(
        prompts[1],
        "Write a joke about Cats but take into account the feedback: needs a pun"
    );
}

#[tokio::test]
async fn evaluator_that_never_accepts_hits_round_cap() {
    let model = Arc::new(grading_model(Vec::new()));
    let graph =
        build_evaluator_optimizer(model.clone(), EvaluatorOptions { max_rounds: 3 }).unwrap();

    let err = graph.invoke(json!({"topic": "Cats"}), &config()).await.unwrap_err();

    assert!(matches!(
        err.root(),
        FlowError::Graph(GraphError::MaxIterationsExceeded { limit: 3 })
    ));
    assert_eq!(err.iteration_limit(), Some(3));
    assert_eq!(generator_prompts(&model).len(), 3);
    assert_eq!(model.call_count(), 6);

    let FlowError::Graph(GraphError::Run { node, state, .. }) = err else {
        panic!("expected run error");
    };
    assert_eq!(node, evaluator::GENERATOR);
    assert_eq!(state["rounds"], 3);
    assert_eq!(state["funny_or_not"], "not funny");
}

#[tokio::test]
async fn recursion_limit_still_bounds_a_generous_round_cap() {
    let model = Arc::new(grading_model(Vec::new()));
    let graph =
        build_evaluator_optimizer(model, EvaluatorOptions { max_rounds: 100 }).unwrap();

    let err = graph
        .invoke(json!({"topic": "Cats"}), &config().with_recursion_limit(8))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::Graph(GraphError::MaxIterationsExceeded { limit: 8 })
    ));
}
