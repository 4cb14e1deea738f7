//! GPT-2 forward pass on candle.
//!
//! Weight names follow the Hugging Face checkpoint layout (`wte`, `wpe`,
//! `h.{i}.attn.c_attn`, ...). Linear layers are stored as `Conv1D`, i.e. with
//! `[in, out]` weights, and the LM head is tied to `wte`.

use candle_core::{D, Device, Module, Result, Tensor};
use candle_nn::{Embedding, LayerNorm, VarBuilder, embedding, layer_norm};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    #[serde(default = "default_n_positions")]
    pub n_positions: usize,
    pub n_embd: usize,
    pub n_layer: usize,
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    /// Hidden size of the MLP; `4 * n_embd` when absent.
    #[serde(default)]
    pub n_inner: Option<usize>,
}

fn default_n_positions() -> usize {
    1024
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

struct Conv1D {
    weight: Tensor,
    bias: Tensor,
}

impl Conv1D {
    fn load(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            weight: vb.get((in_dim, out_dim), "weight")?,
            bias: vb.get(out_dim, "bias")?,
        })
    }
}

impl Module for Conv1D {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        xs.broadcast_matmul(&self.weight)?.broadcast_add(&self.bias)
    }
}

struct Attention {
    c_attn: Conv1D,
    c_proj: Conv1D,
    n_head: usize,
    head_dim: usize,
}

impl Attention {
    fn load(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            c_attn: Conv1D::load(cfg.n_embd, 3 * cfg.n_embd, vb.pp("c_attn"))?,
            c_proj: Conv1D::load(cfg.n_embd, cfg.n_embd, vb.pp("c_proj"))?,
            n_head: cfg.n_head,
            head_dim: cfg.n_embd / cfg.n_head,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        kv: &mut Option<(Tensor, Tensor)>,
    ) -> Result<Tensor> {
        let (b, t, c) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;

        let heads = |x: Tensor| -> Result<Tensor> {
            x.contiguous()?
                .reshape((b, t, self.n_head, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = heads(qkv.narrow(D::Minus1, 0, c)?)?;
        let mut k = heads(qkv.narrow(D::Minus1, c, c)?)?;
        let mut v = heads(qkv.narrow(D::Minus1, 2 * c, c)?)?;

        // Keys and values are `[b, heads, seq, head_dim]`; extend along seq.
        if let Some((past_k, past_v)) = kv.as_ref() {
            k = Tensor::cat(&[past_k, &k], 2)?;
            v = Tensor::cat(&[past_v, &v], 2)?;
        }
        *kv = Some((k.clone(), v.clone()));

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let mut att = (q.matmul(&k.t()?.contiguous()?)? * scale)?;
        if let Some(mask) = mask {
            att = att.broadcast_add(mask)?;
        }
        let att = candle_nn::ops::softmax_last_dim(&att)?;

        let ys = att.matmul(&v)?.transpose(1, 2)?.reshape((b, t, c))?;
        self.c_proj.forward(&ys)
    }
}

struct Mlp {
    c_fc: Conv1D,
    c_proj: Conv1D,
}

impl Mlp {
    fn load(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let inner = cfg.n_inner.unwrap_or(4 * cfg.n_embd);
        Ok(Self {
            c_fc: Conv1D::load(cfg.n_embd, inner, vb.pp("c_fc"))?,
            c_proj: Conv1D::load(inner, cfg.n_embd, vb.pp("c_proj"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        // GPT-2 uses the tanh approximation of GELU.
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            ln_1: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_1"))?,
            attn: Attention::load(cfg, vb.pp("attn"))?,
            ln_2: layer_norm(cfg.n_embd, cfg.layer_norm_epsilon, vb.pp("ln_2"))?,
            mlp: Mlp::load(cfg, vb.pp("mlp"))?,
        })
    }

    fn forward(
        &self,
        xs: &Tensor,
        mask: Option<&Tensor>,
        kv: &mut Option<(Tensor, Tensor)>,
    ) -> Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask, kv)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

/// Keys and values of every block for the tokens already fed through
/// [`Gpt2::forward`]. One cache belongs to one generation; the model itself
/// holds no per-sequence state.
pub struct Cache {
    kvs: Vec<Option<(Tensor, Tensor)>>,
    seq_len: usize,
}

impl Cache {
    /// Number of positions already cached.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }
}

/// A GPT-2 language model.
pub struct Gpt2 {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    config: Config,
    device: Device,
}

impl Gpt2 {
    /// Load weights from `vb`. Checkpoints saved from `GPT2LMHeadModel` nest
    /// everything under `transformer.`; both layouts are accepted.
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };
        let blocks = (0..config.n_layer)
            .map(|i| Block::load(config, vb.pp(format!("h.{i}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            wte: embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?,
            wpe: embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?,
            blocks,
            ln_f: layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?,
            config: config.clone(),
            device: vb.device().clone(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// An empty cache sized for this model.
    pub fn new_cache(&self) -> Cache {
        Cache {
            kvs: vec![None; self.blocks.len()],
            seq_len: 0,
        }
    }

    /// Feed `input_ids` after the tokens already in `cache` and return the
    /// next-token logits (shape `[vocab_size]`).
    pub fn forward(&self, input_ids: &[u32], cache: &mut Cache) -> Result<Tensor> {
        let t = input_ids.len();
        if t == 0 {
            candle_core::bail!("gpt2 forward called with an empty sequence");
        }
        let past = cache.seq_len;
        let total = past + t;
        if total > self.config.n_positions {
            candle_core::bail!(
                "sequence of {total} tokens exceeds the {} position context",
                self.config.n_positions
            );
        }

        let ids = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let positions: Vec<u32> = (past as u32..total as u32).collect();
        let positions = Tensor::new(positions.as_slice(), &self.device)?.unsqueeze(0)?;

        let mut xs = self
            .wte
            .forward(&ids)?
            .broadcast_add(&self.wpe.forward(&positions)?)?;
        // A single new token may attend to everything cached.
        let mask = if t > 1 {
            Some(causal_mask(t, past, &self.device)?)
        } else {
            None
        };
        for (block, kv) in self.blocks.iter().zip(cache.kvs.iter_mut()) {
            xs = block.forward(&xs, mask.as_ref(), kv)?;
        }
        cache.seq_len = total;
        let xs = self.ln_f.forward(&xs)?;

        let last = xs.narrow(1, t - 1, 1)?.squeeze(1)?;
        last.matmul(&self.wte.embeddings().t()?)?.squeeze(0)
    }
}

/// Additive attention mask of shape `[t, past + t]` for `t` new queries
/// following `past` cached positions: `-inf` on future keys, `0` elsewhere.
pub(crate) fn causal_mask(t: usize, past: usize, device: &Device) -> Result<Tensor> {
    let total = past + t;
    let mask: Vec<f32> = (0..t)
        .flat_map(|i| {
            (0..total).map(move |j| if j > past + i { f32::NEG_INFINITY } else { 0.0 })
        })
        .collect();
    Tensor::from_vec(mask, (t, total), device)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use std::collections::HashMap;

    #[test]
    fn causal_mask_hides_future_positions() {
        let mask = causal_mask(3, 0, &Device::Cpu).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(mask[0], [0.0, f32::NEG_INFINITY, f32::NEG_INFINITY]);
        assert_eq!(mask[1], [0.0, 0.0, f32::NEG_INFINITY]);
        assert_eq!(mask[2], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn causal_mask_lets_new_tokens_see_cached_ones() {
        let mask = causal_mask(2, 2, &Device::Cpu).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(mask[0], [0.0, 0.0, 0.0, f32::NEG_INFINITY]);
        assert_eq!(mask[1], [0.0, 0.0, 0.0, 0.0]);
    }

    fn tiny_model() -> Gpt2 {
        let cfg = Config {
            vocab_size: 16,
            n_positions: 8,
            n_embd: 8,
            n_layer: 2,
            n_head: 2,
            layer_norm_epsilon: 1e-5,
            n_inner: None,
        };
        let dev = Device::Cpu;
        let mut ts = HashMap::new();
        let mut put = |name: String, shape: &[usize]| {
            let t = Tensor::randn(0f32, 0.5, shape, &dev).unwrap();
            ts.insert(name, t);
        };
        put("wte.weight".into(), &[16, 8]);
        put("wpe.weight".into(), &[8, 8]);
        put("ln_f.weight".into(), &[8]);
        put("ln_f.bias".into(), &[8]);
        for i in 0..cfg.n_layer {
            let p = format!("h.{i}");
            for ln in ["ln_1", "ln_2"] {
                put(format!("{p}.{ln}.weight"), &[8]);
                put(format!("{p}.{ln}.bias"), &[8]);
            }
            put(format!("{p}.attn.c_attn.weight"), &[8, 24]);
            put(format!("{p}.attn.c_attn.bias"), &[24]);
            put(format!("{p}.attn.c_proj.weight"), &[8, 8]);
            put(format!("{p}.attn.c_proj.bias"), &[8]);
            put(format!("{p}.mlp.c_fc.weight"), &[8, 32]);
            put(format!("{p}.mlp.c_fc.bias"), &[32]);
            put(format!("{p}.mlp.c_proj.weight"), &[32, 8]);
            put(format!("{p}.mlp.c_proj.bias"), &[8]);
        }
        let vb = VarBuilder::from_tensors(ts, DType::F32, &dev);
        Gpt2::load(vb, &cfg).unwrap()
    }

    fn assert_close(a: &Tensor, b: &Tensor) {
        let a = a.to_vec1::<f32>().unwrap();
        let b = b.to_vec1::<f32>().unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "{x} != {y}");
        }
    }

    #[test]
    fn cached_decoding_matches_full_recompute() {
        let model = tiny_model();
        let ids = [3u32, 7, 1, 12, 5, 9];

        let mut cache = model.new_cache();
        let mut step = model.forward(&ids[..3], &mut cache).unwrap();
        assert_close(&step, &model.forward(&ids[..3], &mut model.new_cache()).unwrap());

        for n in 4..=ids.len() {
            step = model.forward(&ids[n - 1..n], &mut cache).unwrap();
            let full = model.forward(&ids[..n], &mut model.new_cache()).unwrap();
            assert_close(&step, &full);
        }
        assert_eq!(cache.seq_len(), ids.len());
        assert_eq!(step.dims(), [16]);
    }

    #[test]
    fn forward_past_context_is_an_error() {
        let model = tiny_model();
        let mut cache = model.new_cache();
        model.forward(&[1; 8], &mut cache).unwrap();
        assert!(model.forward(&[1], &mut cache).is_err());
    }

    #[test]
    fn config_parses_hf_gpt2_json() {
        let json = r#"{
            "activation_function": "gelu_new",
            "architectures": ["GPT2LMHeadModel"],
            "n_ctx": 1024,
            "n_embd": 768,
            "n_head": 12,
            "n_layer": 12,
            "n_positions": 1024,
            "vocab_size": 50257
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.n_embd, 768);
        assert_eq!(cfg.n_positions, 1024);
        assert_eq!(cfg.layer_norm_epsilon, 1e-5);
        assert_eq!(cfg.n_inner, None);
    }
}
