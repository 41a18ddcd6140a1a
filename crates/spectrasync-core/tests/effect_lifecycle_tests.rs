use proptest::prelude::*;
use spectrasync_core::{
    BeatInfo, DispatcherState, EffectDispatcher, EffectParams, EffectRegistry, FeatureSummary,
    MemoryScene, ObjectId, Scene, SceneError, SceneObject,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Add(ObjectId),
    Remove(ObjectId),
}

/// Scene that logs every successful add and remove in order
#[derive(Default)]
struct RecordingScene {
    inner: MemoryScene,
    events: Vec<Event>,
}

impl Scene for RecordingScene {
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn add(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        let id = self.inner.add(object)?;
        self.events.push(Event::Add(id));
        Ok(id)
    }

    fn remove(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        let object = self.inner.remove(id)?;
        self.events.push(Event::Remove(id));
        Ok(object)
    }

    fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.inner.get(id)
    }

    fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.inner.get_mut(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn builtin_ids() -> Vec<String> {
    EffectRegistry::with_builtin()
        .ids()
        .into_iter()
        .map(String::from)
        .collect()
}

fn animate_frames(dispatcher: &mut EffectDispatcher, scene: &mut dyn Scene, frames: usize) {
    let mut features = FeatureSummary::silent(256);
    for i in 0..frames {
        features.frequency_bins.fill((i * 40 % 256) as u8);
        features.band_energy.bass = (i % 4) as f32 / 4.0;
        let beat = BeatInfo {
            is_beat: i % 3 == 0,
            strength: 0.8,
            ..BeatInfo::default()
        };
        dispatcher.animate(scene, &features, i as f64 / 60.0, Some(&beat), None);
    }
}

#[test]
fn test_switching_disposes_before_creating() {
    let ids = builtin_ids();
    for a in &ids {
        for b in &ids {
            let mut scene = RecordingScene::default();
            let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());

            dispatcher.activate(a, &mut scene).unwrap();
            let owned_by_a = dispatcher.active_objects().to_vec();
            animate_frames(&mut dispatcher, &mut scene, 5);
            let switch_at = scene.events.len();

            dispatcher.activate(b, &mut scene).unwrap();
            let after = &scene.events[switch_at..];

            let first_add = after
                .iter()
                .position(|e| matches!(e, Event::Add(_)))
                .expect("b adds objects");
            let removed_before_b: Vec<ObjectId> = after[..first_add]
                .iter()
                .filter_map(|e| match e {
                    Event::Remove(id) => Some(*id),
                    Event::Add(_) => None,
                })
                .collect();

            assert_eq!(
                removed_before_b, owned_by_a,
                "{} -> {}: every object of the old effect goes before the new one is built",
                a, b
            );
            assert_eq!(scene.len(), dispatcher.active_objects().len());
        }
    }
}

#[test]
fn test_adds_match_removes_over_session() {
    let mut scene = RecordingScene::default();
    let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());
    for id in builtin_ids() {
        dispatcher.activate(&id, &mut scene).unwrap();
        animate_frames(&mut dispatcher, &mut scene, 3);
    }
    dispatcher.deactivate(&mut scene);

    let adds = scene.events.iter().filter(|e| matches!(e, Event::Add(_))).count();
    let removes = scene.events.len() - adds;
    assert_eq!(adds, removes);
    assert!(scene.is_empty());
    assert_eq!(dispatcher.state(), DispatcherState::Idle);
}

#[test]
fn test_params_reach_create() {
    let mut scene = MemoryScene::new();
    let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());
    dispatcher.set_param("patternDensity", 2.0);
    dispatcher.activate("spectrum-bars", &mut scene).unwrap();
    assert_eq!(scene.len(), 64);

    let mut params = EffectParams::new();
    params.set("pattern_density", 0.25);
    dispatcher.set_params(params);
    dispatcher.activate("spectrum-bars", &mut scene).unwrap();
    assert_eq!(scene.len(), 8);
}

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    ActivateUnknown,
    Animate(usize),
    Deactivate,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Activate),
        Just(Op::ActivateUnknown),
        (1usize..4).prop_map(Op::Animate),
        Just(Op::Deactivate),
    ]
}

proptest! {
    #[test]
    fn prop_scene_only_holds_active_objects(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let ids = builtin_ids();
        let mut scene = MemoryScene::new();
        let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());

        for op in ops {
            match op {
                Op::Activate(i) => {
                    prop_assert!(dispatcher.activate(&ids[i % ids.len()], &mut scene).is_ok());
                    prop_assert_eq!(dispatcher.state(), DispatcherState::Created);
                }
                Op::ActivateUnknown => {
                    prop_assert!(dispatcher.activate("no-such-effect", &mut scene).is_err());
                    prop_assert_eq!(dispatcher.state(), DispatcherState::Idle);
                }
                Op::Animate(n) => animate_frames(&mut dispatcher, &mut scene, n),
                Op::Deactivate => dispatcher.deactivate(&mut scene),
            }

            let mut owned = dispatcher.active_objects().to_vec();
            owned.sort_unstable();
            prop_assert_eq!(scene.ids(), owned);
        }

        dispatcher.deactivate(&mut scene);
        prop_assert!(scene.is_empty());
        prop_assert_eq!(scene.added_count(), scene.removed_count());
    }
}
