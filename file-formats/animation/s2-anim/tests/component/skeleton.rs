//! Skeleton construction from model data

use crate::common::{model_json, three_bone_model};
use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;
use s2_anim::{AnimError, Skeleton};

#[test]
fn test_three_bone_model() {
    let skeleton = Skeleton::from_model_data(&three_bone_model()).unwrap();

    assert_eq!(skeleton.len(), 3);
    assert_eq!(skeleton.roots(), &[0]);
    assert_eq!(skeleton.render_bone_count(), 3);

    let names: Vec<&str> = skeleton.bones().iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["root", "child", "grandchild"]);

    let grandchild = skeleton.bone_by_name("grandchild").unwrap();
    let origin = grandchild.world_bind_pose.transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
}

#[test]
fn test_traversal_visits_parents_first() {
    let model = model_json(
        &["leaf", "mid", "root", "other_leaf"],
        &[1, 2, -1, 1],
        &[Vec3::X; 4],
        &[Quat::IDENTITY; 4],
        &[0, 1, 2, 3],
    );
    let skeleton = Skeleton::from_model_data(&model).unwrap();

    let order = skeleton.traversal_order();
    assert_eq!(order.len(), 4);
    for (position, &bone) in order.iter().enumerate() {
        if let Some(parent) = skeleton.bones()[bone].parent {
            let parent_position = order.iter().position(|&b| b == parent).unwrap();
            assert!(parent_position < position);
        }
    }
}

#[test]
fn test_remap_table_with_unskinned_bones() {
    // Render slots only for root and grandchild
    let model = model_json(
        &["root", "child", "grandchild"],
        &[-1, 0, 1],
        &[Vec3::ZERO, Vec3::X, Vec3::X],
        &[Quat::IDENTITY; 3],
        &[2, 0],
    );
    let skeleton = Skeleton::from_model_data(&model).unwrap();

    let render: Vec<i32> = skeleton.bones().iter().map(|b| b.render_index_i32()).collect();
    assert_eq!(render, vec![1, -1, 0]);
    assert_eq!(skeleton.last_render_index(), 1);
}

#[test]
fn test_cyclic_model_is_rejected() {
    let model = model_json(
        &["a", "b"],
        &[1, 0],
        &[Vec3::ZERO; 2],
        &[Quat::IDENTITY; 2],
        &[0, 1],
    );
    assert!(matches!(
        Skeleton::from_model_data(&model),
        Err(AnimError::InvalidSkeleton(_))
    ));
}

#[test]
fn test_mismatched_arrays_are_rejected() {
    let mut model = three_bone_model();
    model["m_modelSkeleton"]["m_nParent"] = serde_json::json!([-1, 0]);
    assert!(matches!(
        Skeleton::from_model_data(&model),
        Err(AnimError::InvalidSkeleton(_))
    ));
}

#[test]
fn test_missing_bone_names_is_an_error() {
    let mut model = three_bone_model();
    if let Some(skeleton) = model["m_modelSkeleton"].as_object_mut() {
        skeleton.remove("m_boneName");
    }
    assert!(matches!(
        Skeleton::from_model_data(&model),
        Err(AnimError::MissingKey(_))
    ));
}
