//! Retries compilation until every module's imports are satisfied.

use crate::compiler::SandboxCompiler;
use crate::error::DeadCssError;
use crate::record::ModuleRecord;

/// Where a module stands in the fixpoint loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Pending,
    Compiled,
    Failed,
}

/// Outcome of a converged [`compile_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Passes over the module list, 0 when there was nothing to compile.
    pub passes: usize,
    pub compiled: usize,
}

/// Compiles `modules` in repeated passes until all succeed.
///
/// A module that imports a sibling compiled later in the same pass fails
/// and is retried in the next pass. The loop gives up when a pass after the
/// first compiles nothing new, or after `modules.len() + 1` passes.
pub fn compile_all(
    compiler: &mut SandboxCompiler,
    modules: &[&ModuleRecord],
) -> Result<SchedulerReport, DeadCssError> {
    let mut states = vec![ModuleState::Pending; modules.len()];
    let max_passes = modules.len() + 1;
    let mut passes = 0;

    while states.iter().any(|state| *state != ModuleState::Compiled) {
        passes += 1;
        let mut progressed = false;
        for (module, state) in modules.iter().zip(states.iter_mut()) {
            if *state == ModuleState::Compiled {
                continue;
            }
            if compiler.compile(module) {
                *state = ModuleState::Compiled;
                progressed = true;
            } else {
                *state = ModuleState::Failed;
            }
        }

        let failed = states
            .iter()
            .filter(|state| **state == ModuleState::Failed)
            .count();
        tracing::debug!(pass = passes, failed, "compile pass finished");

        if failed > 0 && ((passes > 1 && !progressed) || passes >= max_passes) {
            let pending = modules
                .iter()
                .zip(&states)
                .filter(|(_, state)| **state == ModuleState::Failed)
                .map(|(module, _)| module.name.clone())
                .collect();
            return Err(DeadCssError::Convergence {
                passes,
                pending,
                last: compiler.take_last_error(),
            });
        }
    }

    Ok(SchedulerReport {
        passes,
        compiled: modules.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ModuleId, UsedExports};

    fn module(id: u32, file: &str, source: &str) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId(id),
            context: "/src".into(),
            name: format!("css-loader!/src/{file}"),
            request: None,
            source: source.to_string(),
            stages: Vec::new(),
            used_exports: UsedExports::All,
        }
    }

    #[test]
    fn test_forward_reference_takes_two_passes() {
        let b = module(1, "b.css", r#"import * as a from "./a.css"; export const b = a.a;"#);
        let a = module(2, "a.css", r#"export const a = "a";"#);
        let mut compiler = SandboxCompiler::new();
        let report = compile_all(&mut compiler, &[&b, &a]).unwrap();
        assert_eq!(report, SchedulerReport { passes: 2, compiled: 2 });
    }

    #[test]
    fn test_reexport_waits_for_its_source() {
        let a = module(1, "a.css", r#"export * from "./b.css"; export const a = "a";"#);
        let b = module(2, "b.css", r#"export const b = "b";"#);
        let mut compiler = SandboxCompiler::new();
        let report = compile_all(&mut compiler, &[&a, &b]).unwrap();
        assert_eq!(report.passes, 2);

        let compiled = compiler.cache().get_id(ModuleId(1)).unwrap();
        assert_eq!(compiled.get("b").and_then(|v| v.as_str()), Some("b"));
        assert_eq!(compiled.get("a").and_then(|v| v.as_str()), Some("a"));
    }

    #[test]
    fn test_empty_input() {
        let mut compiler = SandboxCompiler::new();
        let report = compile_all(&mut compiler, &[]).unwrap();
        assert_eq!(report.passes, 0);
    }

    #[test]
    fn test_no_progress_stops_early() {
        let broken = module(1, "x.css", "export const x = missing.value;");
        let fine = module(2, "y.css", r#"export const y = "y";"#);
        let mut compiler = SandboxCompiler::new();
        let err = compile_all(&mut compiler, &[&broken, &fine]).unwrap_err();
        match err {
            DeadCssError::Convergence {
                passes,
                pending,
                last,
            } => {
                assert_eq!(passes, 2);
                assert_eq!(pending, vec!["css-loader!/src/x.css".to_string()]);
                assert_eq!(last.map(|e| e.module), Some(ModuleId(1)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
