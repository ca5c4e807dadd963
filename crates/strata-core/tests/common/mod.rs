use std::sync::{Arc, Mutex};

use strata_core::colorize::{ColorizeKind, ColorizeOptions, Colorizer, TaskSender};
use strata_core::mesh::Mesh;
use strata_core::options::FixedOptions;
use strata_core::session::ScanSessionController;
use strata_core::sim::{SimColorizer, SimColorizerMode, SimCubeRenderer, SimSensor, SimSlamFactory};
use strata_core::slam::Keyframe;

/// A session wired to simulated collaborators, with handles kept outside so
/// tests can script the sensor and the pose initializer.
pub struct Rig {
    pub session: ScanSessionController,
    pub sensor: SimSensor,
    pub factory: SimSlamFactory,
}

pub fn rig() -> Rig {
    rig_with_sensor(SimSensor::healthy())
}

pub fn rig_with_sensor(sensor: SimSensor) -> Rig {
    let factory = SimSlamFactory::new();
    let session = ScanSessionController::new(
        Box::new(sensor.clone()),
        Box::new(factory.clone()),
        Box::new(SimCubeRenderer::new()),
        Arc::new(SimColorizer::new(SimColorizerMode::Inline)),
        FixedOptions::default(),
    );
    Rig {
        session,
        sensor,
        factory,
    }
}

pub fn rig_with_colorizer(colorizer: Arc<dyn Colorizer>) -> Rig {
    let sensor = SimSensor::healthy();
    let factory = SimSlamFactory::new();
    let session = ScanSessionController::new(
        Box::new(sensor.clone()),
        Box::new(factory.clone()),
        Box::new(SimCubeRenderer::new()),
        colorizer,
        FixedOptions::default(),
    );
    Rig {
        session,
        sensor,
        factory,
    }
}

/// Colorizer that parks every task until the test completes it by hand.
/// Lets tests hold a task "in flight" across assertions.
#[derive(Clone, Default)]
pub struct ManualColorizer {
    tasks: Arc<Mutex<Vec<(ColorizeKind, TaskSender)>>>,
}

impl ManualColorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn take_task(&self) -> Option<(ColorizeKind, TaskSender)> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.is_empty() {
            None
        } else {
            Some(tasks.remove(0))
        }
    }
}

impl Colorizer for ManualColorizer {
    fn start_task(
        &self,
        kind: ColorizeKind,
        _mesh: Mesh,
        _keyframes: Vec<Keyframe>,
        _options: &ColorizeOptions,
        sender: TaskSender,
    ) {
        self.tasks.lock().unwrap().push((kind, sender));
    }
}

pub fn dummy_keyframe() -> Keyframe {
    Keyframe {
        camera_pose: nalgebra::Matrix4::identity(),
        color: vec![0; 4],
        width: 2,
        height: 2,
    }
}
