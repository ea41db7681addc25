use xxhash_rust::xxh3::xxh3_64;

use crate::model::CandidateRecord;

pub const EDUCATION_BUCKETS: usize = 16;
pub const SKILL_SET_BUCKETS: usize = 64;
pub const FEATURE_DIM: usize = 1 + EDUCATION_BUCKETS + SKILL_SET_BUCKETS;

const GROUP_KEY_BITS: u32 = 20;

/// Fixed-width numeric features for one candidate: years of experience
/// followed by hashed bag-of-token buckets for the two text columns.
/// `full_name` never reaches the trainer.
pub fn featurize(record: &CandidateRecord) -> Vec<f32> {
    let mut features = vec![0.0_f32; FEATURE_DIM];
    features[0] = record.years_experience;
    hash_text_into(&record.education, &mut features[1..1 + EDUCATION_BUCKETS]);
    hash_text_into(&record.skill_set, &mut features[1 + EDUCATION_BUCKETS..]);
    features
}

/// Integer group key hashed into 20 bits. Rows whose ids collide fold
/// into one group everywhere downstream.
pub fn group_key(group_id: f32) -> u64 {
    let id = group_id as i64;
    xxh3_64(&id.to_le_bytes()) & ((1_u64 << GROUP_KEY_BITS) - 1)
}

fn hash_text_into(text: &str, buckets: &mut [f32]) {
    for token in tokens(text) {
        let slot = (xxh3_64(token.as_bytes()) % buckets.len() as u64) as usize;
        buckets[slot] += 1.0;
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
