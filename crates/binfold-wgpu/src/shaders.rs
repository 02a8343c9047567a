//! WGSL compute shader sources.
//!
//! The binned-reduction kernel is generated for a configurable workgroup
//! size; the classifier kernels (matmul, relu, softmax, pixel
//! normalization) are fixed sources. All of them are compiled at runtime
//! by the wgpu pipeline; validity is checked under naga in the test suite
//! so a malformed shader fails long before a device is involved.
//!
//! WGSL has no `atomic<f32>`, so the accumulator is an
//! `array<atomic<u32>>` holding f32 bit patterns and every operator is a
//! compare-exchange loop over those bits. The padding invocations of the
//! final workgroup return at the length bounds check without touching
//! memory.

/// Threads per workgroup in the element-wise kernels.
pub const ELEMENTWISE_WORKGROUP: u32 = 64;

/// Square tile side in the matmul kernel.
pub const MATMUL_TILE: u32 = 16;

/// Binned-reduction kernel for the given 1-D workgroup size.
///
/// Bindings: 0 = values (read), 1 = bin indices (read), 2 = accumulator
/// bits (read_write, atomic), 3 = params uniform. `params.op` selects
/// sum (0), max (1), or min (2); anything else is a no-op, and the host
/// rejects it before dispatch.
pub fn reduce_shader_source(workgroup_size: u32) -> String {
    format!(
        r"struct ReduceParams {{
    len: u32,
    bins: u32,
    op: u32,
    _pad: u32,
}}

@group(0) @binding(0) var<storage, read> values: array<f32>;
@group(0) @binding(1) var<storage, read> bin_indices: array<u32>;
@group(0) @binding(2) var<storage, read_write> accum: array<atomic<u32>>;
@group(0) @binding(3) var<uniform> params: ReduceParams;

// Add on top of the observed bit pattern and publish with
// compare-exchange until unchallenged.
fn accum_add(slot: u32, value: f32) {{
    var current = atomicLoad(&accum[slot]);
    loop {{
        let updated = bitcast<u32>(bitcast<f32>(current) + value);
        let result = atomicCompareExchangeWeak(&accum[slot], current, updated);
        if result.exchanged {{
            break;
        }}
        current = result.old_value;
    }}
}}

// Optimistic extremum: drop out as soon as the cell stops improving.
fn accum_max(slot: u32, value: f32) {{
    var current = atomicLoad(&accum[slot]);
    loop {{
        if value <= bitcast<f32>(current) {{
            break;
        }}
        let result = atomicCompareExchangeWeak(&accum[slot], current, bitcast<u32>(value));
        if result.exchanged {{
            break;
        }}
        current = result.old_value;
    }}
}}

fn accum_min(slot: u32, value: f32) {{
    var current = atomicLoad(&accum[slot]);
    loop {{
        if value >= bitcast<f32>(current) {{
            break;
        }}
        let result = atomicCompareExchangeWeak(&accum[slot], current, bitcast<u32>(value));
        if result.exchanged {{
            break;
        }}
        current = result.old_value;
    }}
}}

@compute @workgroup_size({wg}, 1, 1)
fn reduce(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let i = gid.x;
    if i >= params.len {{
        return;
    }}
    let value = values[i];
    let slot = bin_indices[i];
    switch params.op {{
        case 0u: {{ accum_add(slot, value); }}
        case 1u: {{ accum_max(slot, value); }}
        case 2u: {{ accum_min(slot, value); }}
        default: {{}}
    }}
}}
",
        wg = workgroup_size
    )
}

/// Dense layer: `output = a × b + bias`, one thread per output element.
///
/// `a` is M×K row-major, `b` is K×N row-major, `bias` has N entries
/// broadcast across rows. Dispatch a [`MATMUL_TILE`]-square grid.
pub const MATMUL_BIAS_SRC: &str = r"struct MatmulParams {
    m: u32,
    n: u32,
    k: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read> a: array<f32>;
@group(0) @binding(1) var<storage, read> b: array<f32>;
@group(0) @binding(2) var<storage, read> bias: array<f32>;
@group(0) @binding(3) var<storage, read_write> output: array<f32>;
@group(0) @binding(4) var<uniform> params: MatmulParams;

@compute @workgroup_size(16, 16, 1)
fn matmul_bias(@builtin(global_invocation_id) gid: vec3<u32>) {
    let row = gid.y;
    let col = gid.x;
    if row >= params.m || col >= params.n {
        return;
    }
    var sum = bias[col];
    for (var l = 0u; l < params.k; l = l + 1u) {
        sum = sum + a[row * params.k + l] * b[l * params.n + col];
    }
    output[row * params.n + col] = sum;
}
";

/// Element-wise `max(x, 0)`.
pub const RELU_SRC: &str = r"struct ElementwiseParams {
    len: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform> params: ElementwiseParams;

@compute @workgroup_size(64, 1, 1)
fn relu(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if i >= params.len {
        return;
    }
    output[i] = max(input[i], 0.0);
}
";

/// Single-row softmax with max subtraction.
///
/// One invocation walks the whole row; the classifier's row is 10 wide,
/// so there is nothing to parallelize. Dispatch (1, 1, 1).
pub const SOFTMAX_ROW_SRC: &str = r"struct ElementwiseParams {
    len: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform> params: ElementwiseParams;

@compute @workgroup_size(1, 1, 1)
fn softmax_row(@builtin(global_invocation_id) gid: vec3<u32>) {
    if gid.x != 0u || params.len == 0u {
        return;
    }
    var row_max = input[0];
    for (var i = 1u; i < params.len; i = i + 1u) {
        row_max = max(row_max, input[i]);
    }
    var sum = 0.0;
    for (var i = 0u; i < params.len; i = i + 1u) {
        let e = exp(input[i] - row_max);
        output[i] = e;
        sum = sum + e;
    }
    let inv = 1.0 / sum;
    for (var i = 0u; i < params.len; i = i + 1u) {
        output[i] = output[i] * inv;
    }
}
";

/// Pixel intensities in [0, 255] to floats in [0, 1].
pub const NORMALIZE_SRC: &str = r"struct ElementwiseParams {
    len: u32,
    _pad: u32,
}

@group(0) @binding(0) var<storage, read> pixels: array<u32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(0) @binding(2) var<uniform> params: ElementwiseParams;

@compute @workgroup_size(64, 1, 1)
fn normalize_pixels(@builtin(global_invocation_id) gid: vec3<u32>) {
    let i = gid.x;
    if i >= params.len {
        return;
    }
    output[i] = f32(pixels[i]) / 255.0;
}
";

/// Returns all shader sources as `(name, source)` pairs for bulk
/// validation. The reduction kernel is rendered at its default size.
pub fn all_shader_sources() -> Vec<(&'static str, String)> {
    vec![
        ("reduce", reduce_shader_source(64)),
        ("matmul_bias", MATMUL_BIAS_SRC.to_string()),
        ("relu", RELU_SRC.to_string()),
        ("softmax_row", SOFTMAX_ROW_SRC.to_string()),
        ("normalize_pixels", NORMALIZE_SRC.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use naga::front::wgsl;

    fn validate_wgsl(source: &str) -> Result<(), String> {
        let module = wgsl::parse_str(source).map_err(|e| format!("{e}"))?;
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).map_err(|e| format!("{e}"))?;
        Ok(())
    }

    // ── reduce ──────────────────────────────────────────────────

    #[test]
    fn test_reduce_valid_at_common_sizes() {
        for wg in [32u32, 64, 128, 256] {
            validate_wgsl(&super::reduce_shader_source(wg))
                .unwrap_or_else(|e| panic!("workgroup size {wg}: {e}"));
        }
    }

    #[test]
    fn test_reduce_workgroup_size_substituted() {
        let src = super::reduce_shader_source(128);
        assert!(src.contains("@workgroup_size(128, 1, 1)"));
    }

    #[test]
    fn test_reduce_guards_length() {
        let src = super::reduce_shader_source(64);
        assert!(src.contains("i >= params.len"));
    }

    #[test]
    fn test_reduce_accumulates_through_atomics() {
        let src = super::reduce_shader_source(64);
        assert!(src.contains("array<atomic<u32>>"));
        assert!(src.contains("atomicCompareExchangeWeak"));
    }

    #[test]
    fn test_reduce_handles_unknown_op_as_noop() {
        let src = super::reduce_shader_source(64);
        assert!(src.contains("default: {}"));
    }

    // ── classifier kernels ──────────────────────────────────────

    #[test]
    fn test_matmul_bias_valid() {
        validate_wgsl(super::MATMUL_BIAS_SRC).unwrap();
    }

    #[test]
    fn test_relu_valid() {
        validate_wgsl(super::RELU_SRC).unwrap();
    }

    #[test]
    fn test_softmax_row_valid() {
        validate_wgsl(super::SOFTMAX_ROW_SRC).unwrap();
    }

    #[test]
    fn test_normalize_pixels_valid() {
        validate_wgsl(super::NORMALIZE_SRC).unwrap();
    }

    #[test]
    fn test_matmul_tile_matches_source() {
        let needle = format!(
            "@workgroup_size({}, {}, 1)",
            super::MATMUL_TILE,
            super::MATMUL_TILE
        );
        assert!(super::MATMUL_BIAS_SRC.contains(&needle));
    }

    #[test]
    fn test_elementwise_workgroup_matches_source() {
        let needle = format!("@workgroup_size({}, 1, 1)", super::ELEMENTWISE_WORKGROUP);
        assert!(super::RELU_SRC.contains(&needle));
        assert!(super::NORMALIZE_SRC.contains(&needle));
    }

    // ── bulk ────────────────────────────────────────────────────

    #[test]
    fn test_all_shader_sources_validate() {
        let sources = super::all_shader_sources();
        assert_eq!(sources.len(), 5, "expected 5 shader sources");
        for (name, source) in &sources {
            validate_wgsl(source).unwrap_or_else(|e| {
                panic!("shader '{name}' failed validation: {e}");
            });
        }
    }

    #[test]
    fn test_all_shader_sources_non_empty() {
        for (name, source) in super::all_shader_sources() {
            assert!(!source.trim().is_empty(), "shader '{name}' is empty");
        }
    }

    #[test]
    fn test_shader_names_unique() {
        let sources = super::all_shader_sources();
        let names: Vec<_> = sources.iter().map(|(n, _)| *n).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate shader names found");
    }
}
