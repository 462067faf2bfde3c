//! Synthetic alignment records shared by the integration tests

use biometal_cram::cram::{CramRecord, MateInfo, ReadFeature, Tag, FLAG_UNMAPPED};

/// Coordinate-sorted records over `references` references, with a sprinkling
/// of unmapped reads at the end.
pub fn synthetic_records(n: usize, references: i32) -> Vec<CramRecord> {
    let per_reference = (n / references.max(1) as usize).max(1);
    let mut records: Vec<CramRecord> = (0..n)
        .map(|i| {
            let reference_id = ((i / per_reference) as i32).min(references - 1);
            let local = (i % per_reference) as i32;
            mapped(i as i32, reference_id, 10_000 + local * 37)
        })
        .collect();
    for i in 0..n / 10 {
        records.push(unmapped(i as i32));
    }
    records
}

pub fn mapped(i: i32, reference_id: i32, start: i32) -> CramRecord {
    let read_length = 100 + i % 51;
    let mut features = Vec::new();
    if i % 4 == 0 {
        features.push(ReadFeature::SoftClip { position: 1, bases: b"TTAG".to_vec() });
    }
    features.push(ReadFeature::Substitution { position: 20 + i % 30, code: (i % 3) as u8 });
    if i % 5 == 0 {
        features.push(ReadFeature::Insertion { position: 60, bases: b"CA".to_vec() });
    }
    if i % 6 == 0 {
        features.push(ReadFeature::Deletion { position: 70, length: 1 + i % 4 });
    }
    if i % 11 == 0 {
        features.push(ReadFeature::ReadBase { position: 80, base: b'N', quality: 2 });
    }
    if i % 13 == 0 {
        features.push(ReadFeature::HardClip { position: read_length, length: 15 });
    }

    let mut tags = vec![Tag::new(*b"NM", b'c', vec![(features.len() % 4) as u8])];
    if i % 2 == 0 {
        tags.push(Tag::new(*b"RG", b'Z', b"grp1\0".to_vec()));
    }

    CramRecord {
        bam_flags: if i % 2 == 0 { 0x63 } else { 0x93 },
        reference_id,
        read_length,
        alignment_start: start,
        read_group: 0,
        read_name: format!("SRR000001.{}", i).into_bytes(),
        mate: if i % 2 == 0 {
            MateInfo::Downstream { records_to_next: 0 }
        } else {
            MateInfo::Detached {
                flags: 2,
                reference_id,
                alignment_start: start - 180,
                template_size: -(300 + i % 40),
            }
        },
        tags,
        features,
        mapping_quality: if i % 9 == 0 { 0 } else { 60 },
        quality_scores: Some((0..read_length).map(|q| 2 + ((q * 7 + i) % 39) as u8).collect()),
        bases: Vec::new(),
    }
}

pub fn unmapped(i: i32) -> CramRecord {
    let bases: Vec<u8> = (0..75).map(|j| b"ACGT"[((i + j * 3) % 4) as usize]).collect();
    CramRecord {
        bam_flags: FLAG_UNMAPPED,
        reference_id: -1,
        read_length: bases.len() as i32,
        alignment_start: 0,
        read_group: -1,
        read_name: format!("unmapped.{}", i).into_bytes(),
        quality_scores: if i % 2 == 0 { Some(vec![25; bases.len()]) } else { None },
        bases,
        ..Default::default()
    }
}
