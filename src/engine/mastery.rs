use serde_json::{json, Map, Value};

/// Level-count configuration for the classifier, injected by the caller
/// rather than read from ambient state so tests can vary it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasteryConfig {
    num_levels: u32,
}

impl MasteryConfig {
    /// A classifier with zero interior levels is not well-defined.
    pub fn new(num_levels: u32) -> Option<Self> {
        if num_levels == 0 {
            None
        } else {
            Some(Self { num_levels })
        }
    }

    pub fn num_levels(&self) -> u32 {
        self.num_levels
    }
}

/// Discrete mastery level for one topic, in `[0, num_levels + 1]`.
///
/// Zero achieved or zero achievable is level 0; meeting or beating the
/// achievable total is `num_levels + 1`. In between, the level is the
/// ceiling of the scaled ratio, except that a ratio landing exactly on a
/// level boundary counts as entering the next level, not completing the
/// current one.
pub fn mastery_level(achieved: f64, achievable: f64, config: MasteryConfig) -> i64 {
    let num_levels = config.num_levels as f64;
    if achieved <= 0.0 || achievable <= 0.0 {
        return 0;
    }
    if achieved >= achievable {
        return config.num_levels as i64 + 1;
    }
    let unbounded = (achieved / achievable) * num_levels;
    if unbounded.fract() == 0.0 {
        unbounded as i64 + 1
    } else {
        unbounded.ceil() as i64
    }
}

/// Maps a student's topic totals against the achievable totals, producing a
/// `{topic: {student_mastery, class_mastery}}` table for every topic present
/// in the student's totals. Topics with no achievable counterpart classify
/// as level 0 rather than dividing by zero.
///
/// `class_mastery` is a placeholder for a future class-wide aggregate and is
/// always 0; callers must not read meaning into it.
pub fn mastery_mapping(
    user_points: &Map<String, Value>,
    max_points: &Map<String, Value>,
    config: MasteryConfig,
) -> Map<String, Value> {
    let mut mapping = Map::new();
    for (topic, achieved) in user_points {
        let achieved = achieved.as_f64().unwrap_or(0.0);
        let achievable = max_points
            .get(topic)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let level = mastery_level(achieved, achievable, config);
        mapping.insert(
            topic.clone(),
            json!({ "student_mastery": level, "class_mastery": 0 }),
        );
    }
    mapping
}
