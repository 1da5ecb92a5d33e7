use super::{StateBag, Step, StepAction};
use crate::events::event::RunnerEvent;
use crate::events::EventChannel;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Runs steps one after another until one of them halts or the pipeline is cancelled.
pub struct BasicRunner {
    steps: Vec<Arc<dyn Step>>,
    event_channel: Arc<EventChannel>,
}

impl BasicRunner {
    pub fn new(event_channel: Arc<EventChannel>) -> Self {
        Self {
            steps: vec![],
            event_channel,
        }
    }

    pub fn step<S>(mut self, step: S) -> Self
    where
        S: Step + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[instrument(name = "BasicRunner::run", skip(self, state))]
    pub async fn run(&self, state: &StateBag) -> StepAction {
        let mut ran: Vec<Arc<dyn Step>> = vec![];
        let mut action = StepAction::Continue;

        for step in &self.steps {
            if state.is_cancelled() {
                self.event_channel.send(RunnerEvent::PipelineCancelled);
                action = StepAction::Halt;
                break;
            }

            let name = step.name().to_string();
            self.event_channel
                .send(RunnerEvent::StepStarted { step: name.clone() });

            ran.push(step.clone());
            action = step.run(state).await;

            debug!("step {} finished with {:?}", name, action);
            self.event_channel
                .send(RunnerEvent::StepCompleted { step: name, action });

            if action == StepAction::Halt {
                break;
            }
        }

        for step in ran.iter().rev() {
            step.cleanup(state).await;
        }

        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event::Event;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        action: StepAction,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &str, action: StepAction, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.to_string(),
                action,
                log: log.clone(),
            }
        }
    }

    #[async_trait]
    impl Step for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _state: &StateBag) -> StepAction {
            self.log.lock().unwrap().push(format!("run {}", self.name));
            self.action
        }

        async fn cleanup(&self, _state: &StateBag) {
            self.log
                .lock()
                .unwrap()
                .push(format!("cleanup {}", self.name));
        }
    }

    #[tokio::test]
    async fn runs_every_step_and_cleans_up_in_reverse() {
        let log = Arc::new(Mutex::new(vec![]));
        let runner = BasicRunner::new(EventChannel::new().into())
            .step(Recorder::new("a", StepAction::Continue, &log))
            .step(Recorder::new("b", StepAction::Continue, &log));

        let action = runner.run(&StateBag::new()).await;

        assert_eq!(action, StepAction::Continue);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["run a", "run b", "cleanup b", "cleanup a"]
        );
    }

    #[tokio::test]
    async fn stops_at_the_first_halt() {
        let log = Arc::new(Mutex::new(vec![]));
        let runner = BasicRunner::new(EventChannel::new().into())
            .step(Recorder::new("download", StepAction::Halt, &log))
            .step(Recorder::new("boot", StepAction::Continue, &log));

        let action = runner.run(&StateBag::new()).await;

        assert_eq!(action, StepAction::Halt);
        assert_eq!(*log.lock().unwrap(), vec!["run download", "cleanup download"]);
    }

    #[tokio::test]
    async fn does_not_start_steps_once_cancelled() {
        let log = Arc::new(Mutex::new(vec![]));
        let channel: Arc<EventChannel> = EventChannel::new().into();
        let consumer = channel.consumer();
        let runner = BasicRunner::new(channel)
            .step(Recorder::new("download", StepAction::Continue, &log));

        let state = StateBag::new();
        state.cancel();

        assert_eq!(runner.run(&state).await, StepAction::Halt);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(
            consumer.drain(),
            vec![Event::from(RunnerEvent::PipelineCancelled)]
        );
    }
}
