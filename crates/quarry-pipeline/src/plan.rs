//! Route-dependent stage sequencing.
//!
//! Routing always runs first. The route then selects one fixed stage
//! sequence; the pipeline walks it with [`StagePlan`] and dispatches on
//! each [`Stage`], so every route's full path is enumerable up front.

use std::fmt;

use quarry_core::models::RouteDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Route,
    Rank,
    Plan,
    Query,
    Compose,
    Validate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Rank => "rank",
            Self::Plan => "plan",
            Self::Query => "query",
            Self::Compose => "compose",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RETRIEVAL_ONLY: &[Stage] = &[Stage::Rank, Stage::Plan, Stage::Compose, Stage::Validate];
const QUERY_ONLY: &[Stage] = &[Stage::Plan, Stage::Query, Stage::Compose, Stage::Validate];
const HYBRID: &[Stage] = &[
    Stage::Rank,
    Stage::Plan,
    Stage::Query,
    Stage::Compose,
    Stage::Validate,
];

/// The stages following routing, in execution order.
#[derive(Debug, Clone)]
pub struct StagePlan {
    stages: &'static [Stage],
    cursor: usize,
}

impl StagePlan {
    pub fn for_route(route: RouteDecision) -> Self {
        let stages = match route {
            RouteDecision::RetrievalOnly => RETRIEVAL_ONLY,
            RouteDecision::QueryOnly => QUERY_ONLY,
            RouteDecision::Hybrid => HYBRID,
        };
        Self { stages, cursor: 0 }
    }

    /// The full sequence, unaffected by iteration.
    pub fn stages(&self) -> &'static [Stage] {
        self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

impl Iterator for StagePlan {
    type Item = Stage;

    fn next(&mut self) -> Option<Stage> {
        let stage = self.stages.get(self.cursor).copied();
        self.cursor += usize::from(stage.is_some());
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_only_skips_the_query() {
        let plan = StagePlan::for_route(RouteDecision::RetrievalOnly);
        assert!(!plan.contains(Stage::Query));
        assert_eq!(plan.collect::<Vec<_>>(), RETRIEVAL_ONLY);
    }

    #[test]
    fn query_only_skips_ranking() {
        let plan = StagePlan::for_route(RouteDecision::QueryOnly);
        assert!(!plan.contains(Stage::Rank));
        assert_eq!(plan.stages().first(), Some(&Stage::Plan));
    }

    #[test]
    fn every_route_ends_with_compose_then_validate() {
        for route in [
            RouteDecision::RetrievalOnly,
            RouteDecision::QueryOnly,
            RouteDecision::Hybrid,
        ] {
            let stages: Vec<Stage> = StagePlan::for_route(route).collect();
            assert_eq!(&stages[stages.len() - 2..], &[Stage::Compose, Stage::Validate]);
            assert!(!stages.contains(&Stage::Route));
        }
    }

    #[test]
    fn stages_follow_the_route_needs() {
        for route in [
            RouteDecision::RetrievalOnly,
            RouteDecision::QueryOnly,
            RouteDecision::Hybrid,
        ] {
            let plan = StagePlan::for_route(route);
            assert_eq!(plan.contains(Stage::Rank), route.needs_retrieval());
            assert_eq!(plan.contains(Stage::Query), route.needs_query());
            assert!(plan.contains(Stage::Plan));
        }
    }

    #[test]
    fn hybrid_runs_everything() {
        assert_eq!(StagePlan::for_route(RouteDecision::Hybrid).count(), 5);
    }
}
