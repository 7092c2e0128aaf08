#![allow(
    clippy::cast_ptr_alignment,
    clippy::ptr_as_ptr,
    clippy::cast_possible_wrap
)]

/// XOR `payload` in place with the 4-byte masking key.
///
/// Masking and unmasking are the same operation, so applying this twice
/// with the same key restores the input.
pub fn unmask(payload: &mut [u8], mask_key: [u8; 4]) {
    #[cfg(all(target_arch = "x86_64", feature = "simd_masking"))]
    if is_x86_feature_detected!("avx2") {
        // SAFETY: avx2 support was just checked
        unsafe { unmask_avx2(payload, mask_key) };
        return;
    }

    unmask_words(payload, mask_key);
}

#[cfg(all(target_arch = "x86_64", feature = "simd_masking"))]
#[target_feature(enable = "avx2")]
unsafe fn unmask_avx2(payload: &mut [u8], mask_key: [u8; 4]) {
    use std::arch::x86_64::{
        __m256i, _mm256_loadu_si256, _mm256_set1_epi32, _mm256_storeu_si256, _mm256_xor_si256,
    };

    let len = payload.len();
    #[allow(unused_unsafe)]
    let key = unsafe { _mm256_set1_epi32(i32::from_le_bytes(mask_key)) };

    let mut i = 0;
    while i + 32 <= len {
        // SAFETY: i + 32 <= len, loads and stores are unaligned
        unsafe {
            let ptr = payload.as_mut_ptr().add(i) as *mut __m256i;
            _mm256_storeu_si256(ptr, _mm256_xor_si256(_mm256_loadu_si256(ptr), key));
        }
        i += 32;
    }

    // 32 is a multiple of 4, so the key phase is unchanged for the tail
    unmask_words(&mut payload[i..], mask_key);
}

fn unmask_words(payload: &mut [u8], mask_key: [u8; 4]) {
    let key = u32::from_ne_bytes(mask_key);
    let mut chunks = payload.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ key;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    for (b, k) in chunks.into_remainder().iter_mut().zip(mask_key) {
        *b ^= k;
    }
}
