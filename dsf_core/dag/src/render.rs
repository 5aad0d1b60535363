use minijinja::value::Value;
use minijinja::Environment;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Names referenced while rendering one template.
pub type SeenRefs = Arc<Mutex<BTreeSet<String>>>;

/// Registers `ref(name)`, which renders the remote name of a node.
///
/// Unknown names render unchanged; callers check `seen` against the graph
/// afterwards so the error can name both ends of the reference.
pub fn register_ref(
    env: &mut Environment<'_>,
    resolved: Arc<HashMap<String, String>>,
    seen: SeenRefs,
) {
    env.add_function("ref", move |model: String| -> Value {
        seen.lock().insert(model.clone());
        match resolved.get(&model) {
            Some(name) => Value::from(name.clone()),
            None => Value::from(model),
        }
    });
}
