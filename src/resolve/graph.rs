//! Dependency cycle detection over a resolve context.

use super::context::ResolveContext;
use super::resolvable::Resolvable;
use crate::core::Environment;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Find a dependency cycle reachable from `root`.
///
/// Returns the names along the cycle, first name repeated at the end.
pub(crate) fn find_cycle<Env: Environment>(
    context: &ResolveContext<Env>,
    root: &Arc<Resolvable<Env>>,
) -> Option<Vec<String>> {
    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    visit(context, root, &mut marks, &mut stack)
}

fn key<Env: Environment>(resolvable: &Arc<Resolvable<Env>>) -> usize {
    Arc::as_ptr(resolvable) as usize
}

fn visit<Env: Environment>(
    context: &ResolveContext<Env>,
    current: &Arc<Resolvable<Env>>,
    marks: &mut HashMap<usize, Mark>,
    stack: &mut Vec<(usize, String)>,
) -> Option<Vec<String>> {
    let id = key(current);
    match marks.get(&id) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|(k, _)| *k == id).unwrap_or(0);
            let mut cycle: Vec<String> = stack[start..].iter().map(|(_, n)| n.clone()).collect();
            cycle.push(current.name().to_string());
            return Some(cycle);
        }
        None => {}
    }

    marks.insert(id, Mark::Visiting);
    stack.push((id, current.name().to_string()));
    for dep in context.dependencies_of(current) {
        if let Some(cycle) = visit(context, &dep, marks, stack) {
            return Some(cycle);
        }
    }
    stack.pop();
    marks.insert(id, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateBuilder, StateRegistry};
    use crate::core::{Path, RawParams, StateProvider};
    use crate::resolve::{resolved, ResolveDeclaration, ResolveError, ResolveOptions};
    use stillwater::prelude::*;

    fn needs(name: &str, deps: &[&str]) -> ResolveDeclaration {
        ResolveDeclaration::new(name, deps.to_vec(), |_| pure(resolved(())).boxed())
    }

    fn context(decls: Vec<ResolveDeclaration>) -> ResolveContext {
        let registry: StateRegistry = StateRegistry::new();
        let builder = decls
            .into_iter()
            .fold(StateBuilder::new("app"), |builder, decl| builder.resolve(decl));
        registry.register(builder).unwrap();
        let state = registry.state("app").unwrap();
        ResolveContext::new(
            Path::from_target(&state, &RawParams::new(), None).materialize(&RawParams::new()),
        )
    }

    fn resolvable(ctx: &ResolveContext, name: &str) -> Arc<Resolvable> {
        Arc::clone(ctx.path().last().unwrap().resolvable(name).unwrap())
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let ctx = context(vec![needs("a", &["b", "c"]), needs("b", &["c"]), needs("c", &[])]);
        assert_eq!(find_cycle(&ctx, &resolvable(&ctx, "a")), None);
    }

    #[test]
    fn cycle_is_reported_in_dependency_order() {
        let ctx = context(vec![needs("a", &["b"]), needs("b", &["c"]), needs("c", &["a"])]);

        let cycle = find_cycle(&ctx, &resolvable(&ctx, "a")).unwrap();

        assert_eq!(cycle, vec!["a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn cyclic_resolve_fails_fast_instead_of_hanging() {
        let ctx = context(vec![needs("a", &["b"]), needs("b", &["a"])]);

        let err = resolvable(&ctx, "a")
            .get(&ctx, &(), &ResolveOptions::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::Cycle {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }
}
