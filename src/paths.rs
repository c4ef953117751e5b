//! The stable on-disk layout from spec §6. All path construction funnels
//! through here so the contract lives in one place.

use crate::entity::Entity;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn original(objects_root: &Path, entity: Entity, receipt_id: Uuid, ext: &str) -> PathBuf {
    objects_root
        .join(entity.schema())
        .join(receipt_id.to_string())
        .join(format!("original.{ext}"))
}

pub fn normalized(objects_root: &Path, entity: Entity, receipt_id: Uuid) -> PathBuf {
    objects_root
        .join(entity.schema())
        .join(receipt_id.to_string())
        .join("normalized.jpg")
}

pub fn cropped(objects_root: &Path, entity: Entity, receipt_id: Uuid) -> PathBuf {
    objects_root
        .join(entity.schema())
        .join(receipt_id.to_string())
        .join("cropped.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_spec_contract() {
        let root = Path::new("/objects");
        let id = Uuid::nil();
        assert_eq!(
            original(root, Entity::Corp, id, "jpg"),
            PathBuf::from("/objects/corp/00000000-0000-0000-0000-000000000000/original.jpg")
        );
        assert_eq!(
            cropped(root, Entity::SoleProp, id),
            PathBuf::from("/objects/soleprop/00000000-0000-0000-0000-000000000000/cropped.jpg")
        );
    }
}
