//! Integration test for loot spawn, detach and save.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shisha_economy::{
    Attachment, DetachCause, LootObject, LootTable, SaveToken, TierWeights, FALL_TIME_RANGE,
};
use shisha_shared::{AgentId, LootId, LootTier, NetObjectId, Transform, Vec3};

fn owner() -> AgentId {
    AgentId::from_random_bytes([7u8; 16])
}

#[test]
fn test_rolled_loot_survives_save_and_restore() {
    let table = LootTable::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for i in 0..200u32 {
        let rolled = table.roll(&mut rng);
        let mut loot = LootObject::spawn_attached(
            LootId::from_random_bytes([i as u8; 16]),
            NetObjectId(i),
            owner(),
            Transform::IDENTITY,
            rolled.tier,
            rolled.value,
        );
        loot.detach(&mut rng);

        let token = loot.save_token().unwrap();
        let restored = LootObject::restore(
            loot.id(),
            NetObjectId(1_000 + i),
            SaveToken::from_raw(token.raw()),
            loot.transform(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(restored.tier(), rolled.tier);
        assert_eq!(restored.value(), rolled.value);
        assert_eq!(restored.attachment(), Attachment::Free);
    }
}

#[test]
fn test_every_detach_cause_frees_the_object() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for cause in [
        DetachCause::Dropped,
        DetachCause::Grabbed,
        DetachCause::Equipped,
        DetachCause::Bagged,
        DetachCause::OwnerGone,
    ] {
        let mut loot = LootObject::spawn_attached(
            LootId::from_random_bytes([1u8; 16]),
            NetObjectId(1),
            owner(),
            Transform::at(Vec3::new(0.0, 1.0, 0.0)),
            LootTier::Common,
            25,
        );
        assert!(loot.force_detach(cause, &mut rng));
        assert!(loot.grabbable());
        assert!((FALL_TIME_RANGE.0..=FALL_TIME_RANGE.1).contains(&loot.fall_time()));
    }
}

#[test]
fn test_owner_movement_after_grab_is_ignored() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut loot = LootObject::spawn_attached(
        LootId::from_random_bytes([2u8; 16]),
        NetObjectId(2),
        owner(),
        Transform::IDENTITY,
        LootTier::Rare,
        90,
    );

    loot.late_update(Some(Transform::at(Vec3::new(3.0, 0.0, 3.0))));
    loot.force_detach(DetachCause::Grabbed, &mut rng);
    let dropped_at = loot.transform().position;

    for step in 0..30 {
        loot.late_update(Some(Transform::at(Vec3::new(step as f32, 0.0, 0.0))));
    }
    assert_eq!(loot.transform().position, dropped_at);
}

#[test]
fn test_misconfigured_weights_still_roll() {
    let table = LootTable {
        weights: TierWeights::new(0, 0, 0),
        ..LootTable::default()
    };
    let stats = table.run_statistics(99, 20_000);
    assert_eq!(stats.tier_counts.iter().sum::<u64>(), 20_000);
    assert!(stats.tier_counts.iter().all(|&count| count > 0));
}
