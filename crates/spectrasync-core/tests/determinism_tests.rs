use spectrasync_core::{
    BeatInfo, Camera, EffectDispatcher, EffectParams, EffectRegistry, FeatureSummary, MemoryScene,
    SceneObject,
};

fn frames() -> Vec<(FeatureSummary, BeatInfo)> {
    (0..45)
        .map(|i| {
            let mut features = FeatureSummary::silent(512);
            for (j, bin) in features.frequency_bins.iter_mut().enumerate() {
                *bin = ((i * 7 + j * 13) % 256) as u8;
            }
            for (j, sample) in features.time_domain.iter_mut().enumerate() {
                *sample = (128 + ((i + j) % 64) as i32 - 32) as u8;
            }
            features.band_energy.bass = (i % 5) as f32 * 0.2;
            features.band_energy.mid = (i % 3) as f32 * 0.3;
            features.band_energy.treble = 0.1;
            let beat = BeatInfo {
                is_beat: i % 8 == 0,
                strength: 0.6,
                ..BeatInfo::default()
            };
            (features, beat)
        })
        .collect()
}

fn run(effect: &str, params: &EffectParams) -> (Vec<SceneObject>, Camera) {
    let mut scene = MemoryScene::new();
    let mut camera = Camera::default();
    let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());
    dispatcher.set_params(params.clone());
    dispatcher.activate(effect, &mut scene).unwrap();

    for (i, (features, beat)) in frames().iter().enumerate() {
        dispatcher.animate(
            &mut scene,
            features,
            i as f64 / 60.0,
            Some(beat),
            Some(&mut camera),
        );
    }
    let objects = scene.iter().map(|(_, obj)| obj.clone()).collect();
    (objects, camera)
}

#[test]
fn test_every_builtin_is_deterministic() {
    let mut params = EffectParams::new();
    params.set("colorCycle", true);
    params.set("intensity", 1.5);

    for id in EffectRegistry::with_builtin().ids() {
        let first = run(id, &params);
        let second = run(id, &params);
        assert_eq!(first, second, "{} diverged between identical runs", id);
    }
}

#[test]
fn test_audio_changes_the_scene() {
    let params = EffectParams::new();
    let frames = frames();
    for id in EffectRegistry::with_builtin().ids() {
        let mut scene = MemoryScene::new();
        let mut dispatcher = EffectDispatcher::new(EffectRegistry::with_builtin());
        dispatcher.activate(id, &mut scene).unwrap();
        let before: Vec<SceneObject> = scene.iter().map(|(_, o)| o.clone()).collect();

        let (features, beat) = &frames[8];
        dispatcher.set_params(params.clone());
        dispatcher.animate(&mut scene, features, 0.5, Some(beat), None);
        let after: Vec<SceneObject> = scene.iter().map(|(_, o)| o.clone()).collect();

        assert_ne!(before, after, "{} ignored its input", id);
    }
}
