// ============================================================
// Layer 6 — Reader Network (Burn)
// ============================================================
// A small transformer encoder with a question-conditioned span
// head. The document and the question go through the SAME
// encoder separately, which is what makes document embeddings
// reusable across questions:
//
//   document ids ──► encode ──► [1, n, d]  (cached by the caller)
//   question ids ──► encode ──► [1, m, d] ──► mean over m
//                                          ──► question_proj
//                                          ──► [1, 1, d]
//
//   span_logits = span_head(document ⊙ question)  → [1, n, 2]
//                 split into start [1, n] and end [1, n]
//
// encode() expects at most max_seq_len ids per call; longer
// documents are encoded window by window by the caller.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ReaderNetConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl ReaderNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ReaderNet<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm    = LayerNormConfig::new(self.d_model).init(device);
        let question_proj = LinearConfig::new(self.d_model, self.d_model).init(device);
        let span_head     = LinearConfig::new(self.d_model, 2).init(device);
        let dropout       = DropoutConfig::new(self.dropout).init();
        ReaderNet {
            token_embedding, position_embedding, layers,
            final_norm, question_proj, span_head, dropout,
            max_seq_len: self.max_seq_len,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// Post-norm block: attention, then GELU feed-forward, each with a residual.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.self_attn.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

// ─── ReaderNet ────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ReaderNet<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub question_proj:      Linear<B>,
    pub span_head:          Linear<B>,
    pub dropout:            Dropout,
    pub max_seq_len:        usize,
}

pub struct SpanLogitsOutput<B: Backend> {
    pub start_logits: Tensor<B, 2>,
    pub end_logits:   Tensor<B, 2>,
}

impl<B: Backend> ReaderNet<B> {
    /// input_ids: [batch, seq_len] with seq_len ≤ max_seq_len → [batch, seq_len, d_model]
    pub fn encode(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();

        let tok_emb = self.token_embedding.forward(input_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x);
        }
        self.final_norm.forward(x)
    }

    /// document: [batch, n, d_model], question: [batch, m, d_model]
    /// → start_logits, end_logits: [batch, n]
    pub fn span_logits(&self, document: Tensor<B, 3>, question: Tensor<B, 3>) -> SpanLogitsOutput<B> {
        let [batch_size, doc_len, d_model] = document.dims();

        let query = self.question_proj
            .forward(question.mean_dim(1)) // [batch, 1, d_model]
            .expand([batch_size, doc_len, d_model]);

        let logits = self.span_head.forward(document * query); // [batch, n, 2]
        let start_logits = logits.clone()
            .slice([0..batch_size, 0..doc_len, 0..1])
            .reshape([batch_size, doc_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..doc_len, 1..2])
            .reshape([batch_size, doc_len]);

        SpanLogitsOutput { start_logits, end_logits }
    }
}
