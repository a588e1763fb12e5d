//! Genes, genomes and the genetic operators that derive one genome from
//! another.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use zoe_lang::{Block, Expression, Operation, Operator, Rule, TreeBias};

use crate::WorldError;

/// One heritable rule. Immutable once built and shared between genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    serial: u64,
    rule: Rule,
}

impl Gene {
    #[must_use]
    pub fn serial(&self) -> u64 {
        self.serial
    }

    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub fn condition(&self) -> Option<&Block> {
        self.rule.condition.as_ref()
    }

    #[must_use]
    pub fn action(&self) -> &Block {
        &self.rule.action
    }

    /// Whether the action can ever produce offspring.
    #[must_use]
    pub fn is_fertile(&self) -> bool {
        fn breeds(expression: &Expression) -> bool {
            match expression {
                Expression::Block(block) => block.iter().any(breeds),
                Expression::Operation(Operation { operator, operand }) => {
                    matches!(operator, Operator::Spawn | Operator::Split)
                        || operand.as_deref().is_some_and(breeds)
                }
                _ => false,
            }
        }
        self.rule.action.iter().any(breeds)
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.rule, f)
    }
}

/// Ordered, never empty list of genes. Earlier genes take priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Arc<Gene>>,
}

impl Genome {
    pub fn new(genes: Vec<Arc<Gene>>) -> Result<Self, WorldError> {
        if genes.is_empty() {
            return Err(WorldError::EmptyGenome);
        }
        Ok(Self { genes })
    }

    #[must_use]
    pub fn single(gene: Arc<Gene>) -> Self {
        Self { genes: vec![gene] }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Gene>> {
        self.genes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Gene>> {
        self.genes.iter()
    }

    /// Serials of the genes, in priority order.
    #[must_use]
    pub fn serials(&self) -> Vec<u64> {
        self.genes.iter().map(|gene| gene.serial).collect()
    }

    #[must_use]
    pub fn render(&self, separator: &str) -> String {
        self.genes
            .iter()
            .map(|gene| gene.rule.render(separator))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(" "))
    }
}

/// Gene-level edit applied by [`GeneFactory::mutate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Insert,
    Delete,
    Translocate,
    Replace,
}

impl Mutation {
    const ALL: [Mutation; 4] = [
        Mutation::Insert,
        Mutation::Delete,
        Mutation::Translocate,
        Mutation::Replace,
    ];
}

/// Strategy used to combine two parent genomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recombination {
    /// Alternate genes from each parent, then flush the longer one.
    Interleave,
    /// A prefix of one parent followed by a suffix of the other.
    Crossover,
    /// The mother's genome with one gene borrowed from the father.
    Swap,
}

impl Recombination {
    const ALL: [Recombination; 3] = [
        Recombination::Interleave,
        Recombination::Crossover,
        Recombination::Swap,
    ];
}

/// Builds genes and applies the genetic operators.
///
/// Owns the gene serial counter, so every gene created in a world comes
/// through here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneFactory {
    bias: TreeBias,
    expression_mutation_freq: f64,
    next_serial: u64,
}

impl GeneFactory {
    #[must_use]
    pub fn new(bias: TreeBias, expression_mutation_freq: f64) -> Self {
        Self {
            bias,
            expression_mutation_freq,
            next_serial: 0,
        }
    }

    pub fn set_bias(&mut self, bias: TreeBias, expression_mutation_freq: f64) {
        self.bias = bias;
        self.expression_mutation_freq = expression_mutation_freq;
    }

    /// Number of genes created so far.
    #[must_use]
    pub fn genes_created(&self) -> u64 {
        self.next_serial
    }

    pub fn gene(&mut self, rule: Rule) -> Arc<Gene> {
        self.next_serial += 1;
        Arc::new(Gene {
            serial: self.next_serial,
            rule,
        })
    }

    pub fn random_gene(&mut self, rng: &mut dyn RngCore) -> Arc<Gene> {
        let rule = self.bias.rule(rng);
        self.gene(rule)
    }

    /// `Do { Split }`: the whole genome of algae.
    pub fn split_gene(&mut self) -> Arc<Gene> {
        self.gene(Rule {
            condition: None,
            action: Block::new(vec![Expression::Operation(Operation::bare(
                Operator::Split,
            ))]),
        })
    }

    /// Between one and `max_genes` random genes.
    pub fn random_genome(&mut self, rng: &mut dyn RngCore, max_genes: usize) -> Genome {
        let count = 1 + rng.random_range(0..max_genes.max(1));
        let genes = (0..count).map(|_| self.random_gene(rng)).collect();
        Genome { genes }
    }

    /// Genome built from parsed rules.
    pub fn genome_from_rules(&mut self, rules: Vec<Rule>) -> Result<Genome, WorldError> {
        Genome::new(rules.into_iter().map(|rule| self.gene(rule)).collect())
    }

    /// One mutation pass: a uniformly chosen gene is deleted, moved,
    /// replaced or followed by a new random gene. Deletion falls back to
    /// translocation and translocation to insertion when only one gene
    /// exists.
    pub fn mutate(&mut self, genome: &Genome, rng: &mut dyn RngCore) -> (Genome, Mutation) {
        let mut genes = genome.genes.clone();
        let position = rng.random_range(0..genes.len());
        let drawn = Mutation::ALL[rng.random_range(0..Mutation::ALL.len())];
        let applied = match drawn {
            Mutation::Delete | Mutation::Translocate if genes.len() > 1 => drawn,
            Mutation::Delete | Mutation::Translocate => Mutation::Insert,
            other => other,
        };
        match applied {
            Mutation::Insert => {
                let gene = self.random_gene(rng);
                genes.insert(position + 1, gene);
            }
            Mutation::Delete => {
                genes.remove(position);
            }
            Mutation::Translocate => {
                let gene = genes.remove(position);
                let to = rng.random_range(0..genes.len());
                genes.insert(to, gene);
            }
            Mutation::Replace => {
                genes[position] = self.random_gene(rng);
            }
        }
        if self.expression_mutation_freq > 0.0 && rng.random::<f64>() < self.expression_mutation_freq
        {
            self.mutate_expression(&mut genes, rng);
        }
        (Genome { genes }, applied)
    }

    /// Rewrites one statement of one gene, leaving the shared original alone.
    fn mutate_expression(&mut self, genes: &mut [Arc<Gene>], rng: &mut dyn RngCore) {
        let index = rng.random_range(0..genes.len());
        let mut rule = genes[index].rule.deep_copy();
        match rule.condition.as_mut() {
            Some(condition) if rng.random::<bool>() => {
                self.bias.mutate_block(condition, rng, false);
            }
            _ => {
                self.bias.mutate_block(&mut rule.action, rng, true);
            }
        }
        genes[index] = self.gene(rule);
    }

    /// Combines two genomes with a uniformly chosen strategy.
    pub fn recombine(
        &mut self,
        mother: &Genome,
        father: &Genome,
        rng: &mut dyn RngCore,
    ) -> (Genome, Recombination) {
        let strategy = Recombination::ALL[rng.random_range(0..Recombination::ALL.len())];
        (self.recombine_with(mother, father, strategy, rng), strategy)
    }

    pub fn recombine_with(
        &mut self,
        mother: &Genome,
        father: &Genome,
        strategy: Recombination,
        rng: &mut dyn RngCore,
    ) -> Genome {
        let genes = match strategy {
            Recombination::Interleave => interleave(&mother.genes, &father.genes, rng),
            Recombination::Crossover => {
                if rng.random::<bool>() {
                    crossover(&mother.genes, &father.genes, rng)
                } else {
                    crossover(&father.genes, &mother.genes, rng)
                }
            }
            Recombination::Swap => {
                let mut genes = mother.genes.clone();
                let borrowed = father.genes[rng.random_range(0..father.genes.len())].clone();
                let at = rng.random_range(0..genes.len());
                genes.insert(at, borrowed);
                genes
            }
        };
        Genome { genes }
    }

    /// Copy of the mother's genome with one mutation pass.
    pub fn inherit_asexual(&mut self, mother: &Genome, rng: &mut dyn RngCore) -> Genome {
        self.mutate(mother, rng).0
    }

    /// Recombination of both parents followed by one mutation pass.
    pub fn inherit_sexual(
        &mut self,
        mother: &Genome,
        father: &Genome,
        rng: &mut dyn RngCore,
    ) -> Genome {
        let (child, _) = self.recombine(mother, father, rng);
        self.mutate(&child, rng).0
    }
}

fn interleave(mother: &[Arc<Gene>], father: &[Arc<Gene>], rng: &mut dyn RngCore) -> Vec<Arc<Gene>> {
    let mut from_mother = rng.random::<bool>();
    let shared = mother.len().min(father.len());
    let mut genes = Vec::with_capacity(mother.len().max(father.len()));
    for i in 0..shared {
        genes.push(if from_mother {
            mother[i].clone()
        } else {
            father[i].clone()
        });
        from_mother = !from_mother;
    }
    genes.extend_from_slice(&mother[shared..]);
    genes.extend_from_slice(&father[shared..]);
    genes
}

/// At least one gene of `head` followed by the matching tail of `tail`.
fn crossover(head: &[Arc<Gene>], tail: &[Arc<Gene>], rng: &mut dyn RngCore) -> Vec<Arc<Gene>> {
    let splice: f64 = rng.random();
    let from_head = ((splice * head.len() as f64).round() as usize).clamp(1, head.len());
    let from_tail = (((1.0 - splice) * tail.len() as f64).round() as usize).min(tail.len());
    let mut genes = head[..from_head].to_vec();
    genes.extend_from_slice(&tail[tail.len() - from_tail..]);
    genes
}
