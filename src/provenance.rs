use kube::api::ObjectMeta;

/// Label recording which virtual cluster a host object belongs to.
pub static MARKER_LABEL: &str = "managed-by.syncer.vcluster.x-k8s.io";

/// Annotation carrying the original virtual object name.
pub static NAME_ANNOTATION: &str = "object-name.syncer.vcluster.x-k8s.io";

/// Annotation carrying the original virtual object UID. Empty before the
/// virtual object has been assigned one.
pub static UID_ANNOTATION: &str = "object-uid.syncer.vcluster.x-k8s.io";

/// Stamp ownership onto host object metadata.
///
/// Returns whether any value actually changed, so callers can skip writes
/// that would be no-ops.
pub fn attach(
    meta: &mut ObjectMeta,
    virtual_name: &str,
    virtual_uid: &str,
    vcluster_name: &str,
) -> bool {
    let mut changed = false;

    let labels = meta.labels.get_or_insert_with(Default::default);
    changed |= labels
        .insert(MARKER_LABEL.to_string(), vcluster_name.to_string())
        .as_deref()
        != Some(vcluster_name);

    let annotations = meta.annotations.get_or_insert_with(Default::default);
    changed |= annotations
        .insert(NAME_ANNOTATION.to_string(), virtual_name.to_string())
        .as_deref()
        != Some(virtual_name);
    changed |= annotations
        .insert(UID_ANNOTATION.to_string(), virtual_uid.to_string())
        .as_deref()
        != Some(virtual_uid);

    changed
}

/// The marker label is the sole ownership signal: objects without a
/// matching marker are foreign and must never be mutated or deleted.
pub fn matches(meta: &ObjectMeta, vcluster_name: &str) -> bool {
    meta.labels
        .as_ref()
        .and_then(|labels| labels.get(MARKER_LABEL))
        .is_some_and(|owner| owner == vcluster_name)
}

pub fn virtual_name(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations.as_ref()?.get(NAME_ANNOTATION).map(String::as_str)
}

pub fn virtual_uid(meta: &ObjectMeta) -> Option<&str> {
    meta.annotations.as_ref()?.get(UID_ANNOTATION).map(String::as_str)
}
