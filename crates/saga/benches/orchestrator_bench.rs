use criterion::{Criterion, criterion_group, criterion_main};
use saga::{RecordingListener, SagaOptions, SagaOrchestrator, Step, StepError};

use std::sync::Arc;

fn add(name: &str, n: u64) -> Step<u64> {
    Step::new(name, move |acc: u64, _ctx| async move { Ok(acc + n) })
        .with_compensation(|_acc, _ctx| async move { Ok(()) })
}

fn chain(len: usize) -> Vec<Step<u64>> {
    (0..len).map(|i| add(&format!("step_{i}"), 1)).collect()
}

fn bench_success_10_steps(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = SagaOrchestrator::new();
    let steps = chain(10);

    c.bench_function("saga/success_10_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = orchestrator
                    .execute(&steps, 0, SagaOptions::default())
                    .await
                    .unwrap();
                assert!(result.is_success());
            });
        });
    });
}

fn bench_failure_compensates_9_steps(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = SagaOrchestrator::new();
    let mut steps = chain(9);
    steps.push(Step::new("reject", |_acc: u64, _ctx| async move {
        Err(StepError::rejected("rejected"))
    }));

    c.bench_function("saga/failure_compensates_9_steps", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = orchestrator
                    .execute(&steps, 0, SagaOptions::default())
                    .await
                    .unwrap();
                assert_eq!(result.metadata().compensated_steps.len(), 9);
            });
        });
    });
}

fn bench_success_with_listener(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let listener = RecordingListener::new();
    let orchestrator = SagaOrchestrator::new().with_listener(Arc::new(listener.clone()));
    let steps = chain(10);

    c.bench_function("saga/success_10_steps_with_listener", |b| {
        b.iter(|| {
            rt.block_on(async {
                orchestrator
                    .execute(&steps, 0, SagaOptions::default())
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_success_10_steps,
    bench_failure_compensates_9_steps,
    bench_success_with_listener,
);
criterion_main!(benches);
