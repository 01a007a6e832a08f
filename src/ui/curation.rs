/// Three-step tab curation workflow: intent → ratings → learning plan

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use patternfly_yew::prelude::*;
use crate::curation::{
    self, ContentRating, LearningPlan, TabIntent, high_rated,
};
use crate::storage::{self, LearningPlanBook};
use crate::tab_data::TabInfo;

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabsForDomain(domain: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn closeTabs(tab_ids: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn callGenerativeApi(prompt: &str) -> Result<JsValue, JsValue>;
}

#[derive(Clone, PartialEq)]
enum WorkflowState {
    Ready,
    Busy(String),
    Intent,
    Ratings,
    Plan,
    Failed(String),
}

#[derive(Properties, PartialEq)]
pub struct CurationProps {
    pub domain: String,
}

#[function_component(CurationWorkflow)]
pub fn curation_workflow(props: &CurationProps) -> Html {
    let state = use_state(|| WorkflowState::Ready);
    let tabs = use_state(Vec::<TabInfo>::new);
    let intent = use_state(TabIntent::default);
    let ratings = use_state(Vec::<ContentRating>::new);
    let plan = use_state(|| None::<LearningPlan>);
    let plan_saved = use_state(|| false);

    // Step 1: infer the intent behind the domain's open tabs
    let on_start = {
        let state = state.clone();
        let tabs = tabs.clone();
        let intent = intent.clone();
        let domain = props.domain.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let tabs = tabs.clone();
            let intent = intent.clone();
            let domain = domain.clone();

            state.set(WorkflowState::Busy("Analyzing intent...".to_string()));
            spawn_local(async move {
                let found = match domain_tabs(&domain).await {
                    Ok(found) => found,
                    Err(e) => {
                        state.set(WorkflowState::Failed(e));
                        return;
                    }
                };
                if found.is_empty() {
                    state.set(WorkflowState::Failed("No tabs found for this domain".to_string()));
                    return;
                }

                match generate(&curation::intent_prompt(&found)).await {
                    Ok(body) => {
                        intent.set(curation::parse_intent(&body));
                        tabs.set(found);
                        state.set(WorkflowState::Intent);
                    }
                    Err(e) => state.set(WorkflowState::Failed(e)),
                }
            });
        })
    };

    // Step 2: rate each relevant tab against the intent
    let on_rate = {
        let state = state.clone();
        let tabs = tabs.clone();
        let intent = intent.clone();
        let ratings = ratings.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let tabs = tabs.clone();
            let intent = intent.clone();
            let ratings = ratings.clone();

            state.set(WorkflowState::Busy("Rating content...".to_string()));
            spawn_local(async move {
                let relevant: Vec<TabInfo> = tabs
                    .iter()
                    .filter(|tab| intent.relevant_tabs.contains(&tab.title))
                    .cloned()
                    .collect();

                let mut rated = Vec::with_capacity(relevant.len());
                for tab in &relevant {
                    let rating = match generate(&curation::rating_prompt(&intent.intent, tab)).await {
                        Ok(body) => curation::parse_rating(&body, tab.id),
                        Err(e) => {
                            log::warn!("rating failed for tab {}: {}", tab.id, e);
                            ContentRating::failed(tab.id, "failed to rate content")
                        }
                    };
                    rated.push(rating);
                }

                ratings.set(rated);
                state.set(WorkflowState::Ratings);
            });
        })
    };

    // Step 3: turn the high-rated tabs into a learning plan
    let on_plan = {
        let state = state.clone();
        let tabs = tabs.clone();
        let ratings = ratings.clone();
        let plan = plan.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let tabs = tabs.clone();
            let ratings = ratings.clone();
            let plan = plan.clone();

            state.set(WorkflowState::Busy("Generating learning plan...".to_string()));
            spawn_local(async move {
                let picked = high_rated(&ratings, &tabs);
                match generate(&curation::plan_prompt(&picked)).await {
                    Ok(body) => {
                        plan.set(Some(curation::parse_plan(&body)));
                        state.set(WorkflowState::Plan);
                    }
                    Err(e) => state.set(WorkflowState::Failed(e)),
                }
            });
        })
    };

    let on_save_plan = {
        let state = state.clone();
        let plan = plan.clone();
        let plan_saved = plan_saved.clone();

        Callback::from(move |_| {
            let Some(current) = (*plan).clone() else {
                return;
            };
            let state = state.clone();
            let plan_saved = plan_saved.clone();

            spawn_local(async move {
                match save_plan(current).await {
                    Ok(id) => {
                        log::info!("saved learning plan {}", id);
                        plan_saved.set(true);
                    }
                    Err(e) => state.set(WorkflowState::Failed(e)),
                }
            });
        })
    };

    let on_close_unused = {
        let state = state.clone();
        let ratings = ratings.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let low_rated: Vec<i32> = ratings
                .iter()
                .filter(|rating| !rating.is_high())
                .map(|rating| rating.tab_id)
                .collect();
            if low_rated.is_empty() {
                return;
            }

            spawn_local(async move {
                match serde_wasm_bindgen::to_value(&low_rated) {
                    Ok(ids) => {
                        if let Err(e) = closeTabs(ids).await {
                            state.set(WorkflowState::Failed(format!("Failed to close tabs: {:?}", e)));
                        }
                    }
                    Err(e) => state.set(WorkflowState::Failed(format!("Failed to serialize ids: {:?}", e))),
                }
            });
        })
    };

    html! {
        <div class="step-container">
            <h3>{format!("Curate: {}", props.domain)}</h3>

            {match &*state {
                WorkflowState::Ready => html! {
                    <Button onclick={on_start}>{"Analyze Open Tabs"}</Button>
                },
                WorkflowState::Busy(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg.clone()}</p>
                    </div>
                },
                WorkflowState::Failed(err) => html! {
                    <div class="error-message">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                        <p>{"Please try again or select a different domain."}</p>
                    </div>
                },
                WorkflowState::Intent => html! {
                    <div class="intent-summary">
                        <h4>{"Step 1: Intent Analysis"}</h4>
                        <p class="intent-description">{intent.intent.clone()}</p>
                        <h4>{"Relevant Tabs:"}</h4>
                        <ul class="tabs-list">
                            {for intent.relevant_tabs.iter().map(|title| html! {
                                <li class="tab-item">{title.clone()}</li>
                            })}
                        </ul>
                        <Button onclick={on_rate}>{"Continue to Rating"}</Button>
                    </div>
                },
                WorkflowState::Ratings => html! {
                    <div class="ratings-list">
                        <h4>{"Step 2: Content Quality Ratings"}</h4>
                        {for ratings.iter().map(|rating| {
                            let title = tabs
                                .iter()
                                .find(|tab| tab.id == rating.tab_id)
                                .map(|tab| tab.title.clone())
                                .unwrap_or_else(|| format!("Tab {}", rating.tab_id));
                            html! {
                                <div key={rating.tab_id} class={if rating.is_high() { "rating-item high-rated" } else { "rating-item" }}>
                                    <h5>{title}</h5>
                                    <p>{format!("Rating: {}/10", rating.rating)}</p>
                                    <p>{rating.explanation.clone()}</p>
                                </div>
                            }
                        })}
                        <Button onclick={on_plan}>{"Generate Learning Plan"}</Button>
                    </div>
                },
                WorkflowState::Plan => view_plan(&plan, *plan_saved, on_save_plan, on_close_unused),
            }}
        </div>
    }
}

fn view_plan(
    plan: &Option<LearningPlan>,
    saved: bool,
    on_save: Callback<MouseEvent>,
    on_close_unused: Callback<MouseEvent>,
) -> Html {
    let Some(plan) = plan else {
        return html! {
            <div class="error-message">
                <p>{"Learning plan not available."}</p>
                <p>{"Please complete the previous steps first."}</p>
            </div>
        };
    };

    html! {
        <div class="learning-plan">
            <h4>{"Step 3: Your Learning Plan"}</h4>

            <h5>{"Reading Sequence"}</h5>
            <ol>
                {for plan.reading_sequence.iter().map(|item| html! {
                    <li>
                        <span class="reading-title">{item.title.clone()}</span>
                        <span class="reading-time">{format!(" — {} mins", item.estimated_time)}</span>
                    </li>
                })}
            </ol>

            <h5>{"Practical Exercises"}</h5>
            <ul>
                {for plan.practical_exercises.iter().map(|exercise| html! {
                    <li>{exercise.clone()}</li>
                })}
            </ul>

            <h5>{"Implementation Steps"}</h5>
            <ol>
                {for plan.implementation_steps.iter().map(|step| html! {
                    <li>{step.clone()}</li>
                })}
            </ol>

            <h5>{"Next Actions"}</h5>
            <ul class="checklist">
                {for plan.next_actions.iter().map(|action| html! {
                    <li>{action.clone()}</li>
                })}
            </ul>

            <div class="step-actions">
                <Button onclick={on_save} disabled={saved}>
                    {if saved { "Plan Saved" } else { "Save Learning Plan" }}
                </Button>
                <Button onclick={on_close_unused} variant={ButtonVariant::Secondary}>
                    {"Close Unused Tabs"}
                </Button>
            </div>
        </div>
    }
}

// Helper functions

async fn generate(prompt: &str) -> Result<String, String> {
    let body = callGenerativeApi(prompt)
        .await
        .map_err(|e| format!("API call failed: {:?}", e))?;
    body.as_string()
        .ok_or_else(|| "API returned a non-string response".to_string())
}

async fn domain_tabs(domain: &str) -> Result<Vec<TabInfo>, String> {
    let tabs_js = queryTabsForDomain(domain)
        .await
        .map_err(|e| format!("Failed to query tabs: {:?}", e))?;
    serde_wasm_bindgen::from_value(tabs_js).map_err(|e| format!("Failed to parse tabs: {:?}", e))
}

async fn save_plan(plan: LearningPlan) -> Result<String, String> {
    let stored = getStorage(storage::LEARNING_PLANS_KEY)
        .await
        .map_err(|e| format!("Failed to load plans: {:?}", e))?;

    let mut book: LearningPlanBook = if stored.is_null() || stored.is_undefined() {
        LearningPlanBook::default()
    } else {
        serde_wasm_bindgen::from_value(stored)
            .map_err(|e| format!("Failed to parse plans: {:?}", e))?
    };

    let id = book.add(plan);

    let value = serde_wasm_bindgen::to_value(&book)
        .map_err(|e| format!("Failed to serialize plans: {:?}", e))?;
    setStorage(storage::LEARNING_PLANS_KEY, value)
        .await
        .map_err(|e| format!("Failed to save plans: {:?}", e))?;

    Ok(id)
}
