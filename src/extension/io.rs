use std::{io::Write, path::Path, rc::Rc};

use itertools::Itertools;

use crate::{
    knot::KnotVector,
    misc::{FloatingPoint, Invertible, Tokenizer},
    patch::NurbsPatch,
    topology::PatchTopology,
};

use super::{knot_vectors::direction_edges, NurbsExtension, ReadOptions};

impl<T: FloatingPoint> NurbsExtension<T> {
    /// Read a NURBS mesh with the default options
    pub fn try_from_str(input: &str) -> anyhow::Result<Self> {
        Self::try_from_str_with_options(input, ReadOptions::default())
    }

    pub fn try_read<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let input = std::fs::read_to_string(path.as_ref())?;
        Self::try_from_str(&input)
    }

    /// Read a NURBS mesh
    /// ```text
    /// <patch topology>
    /// knotvectors
    /// <n>
    /// <order> <ncp> <knots...>   (n times)
    /// [mesh_elements
    ///  <n> <element...>]
    /// [periodic
    ///  <n> <master...>
    ///  <n> <slave...>]
    /// [weights <w...> | unitweights | autoweights]
    /// ```
    /// The `knotvectors` section may be replaced by `patches` followed by one patch block
    /// per topology element, the unique knot vectors then come from the patches.
    pub fn try_from_str_with_options(input: &str, options: ReadOptions) -> anyhow::Result<Self> {
        let mut tokens = Tokenizer::new(input);
        let topology = PatchTopology::try_parse(&mut tokens)?;
        let mut ext = Self::empty(Rc::new(topology), true);
        ext.check_patches()?;
        if options.check_bdr_patches {
            ext.check_bdr_patches()?;
        }

        let line = tokens.line();
        match tokens.next_token()? {
            "knotvectors" => {
                let n = tokens.parse_usize()?;
                ext.knot_vectors = (0..n)
                    .map(|_| KnotVector::try_parse(&mut tokens))
                    .collect::<anyhow::Result<Vec<_>>>()?;
            }
            "patches" => {
                ext.patches = (0..ext.num_patches())
                    .map(|_| NurbsPatch::try_parse(&mut tokens))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                ext.knot_vectors = ext.unique_kv_from_patches()?;
            }
            other => anyhow::bail!(
                "expected section 'knotvectors' or 'patches' at line {}, found '{}'",
                line,
                other
            ),
        }

        ext.check_knot_references()?;
        ext.create_comprehensive_kv()?;
        ext.set_orders_from_knot_vectors();
        ext.generate_offsets()?;
        ext.count_elements();
        ext.count_bdr_elements();

        if !ext.have_patches() && tokens.peek() == Some("mesh_elements") {
            tokens.next_token()?;
            let n = tokens.parse_usize()?;
            ext.active_elements = vec![false; ext.num_elements];
            for _ in 0..n {
                let e = tokens.parse_usize()?;
                anyhow::ensure!(
                    e < ext.num_elements,
                    "active element {} is beyond the {} elements",
                    e,
                    ext.num_elements
                );
                ext.active_elements[e] = true;
            }
            ext.num_active_elements = ext.active_elements.iter().filter(|a| **a).count();
        } else {
            ext.set_all_elements_active();
        }

        ext.generate_active_vertices()?;
        ext.init_dof_map();
        ext.generate_element_dof_table()?;
        ext.generate_active_bdr_elems();
        ext.generate_bdr_element_dof_table()?;

        if tokens.peek() == Some("periodic") {
            tokens.next_token()?;
            let n = tokens.parse_usize()?;
            ext.master = (0..n)
                .map(|_| tokens.parse_usize())
                .collect::<anyhow::Result<Vec<_>>>()?;
            let n = tokens.parse_usize()?;
            ext.slave = (0..n)
                .map(|_| tokens.parse_usize())
                .collect::<anyhow::Result<Vec<_>>>()?;
        }
        ext.connect_boundaries()?;

        if !ext.have_patches() {
            let line = tokens.line();
            match tokens.peek() {
                Some("weights") => {
                    tokens.next_token()?;
                    ext.weights = tokens.parse_reals(ext.num_active_dofs)?;
                }
                Some("unitweights") | Some("autoweights") | None => {
                    if !tokens.is_empty() {
                        tokens.next_token()?;
                    }
                    ext.weights = vec![T::one(); ext.num_active_dofs];
                }
                Some(other) => anyhow::bail!(
                    "expected section 'weights' at line {}, found '{}'",
                    line,
                    other
                ),
            }
        }

        log::info!(
            "read NURBS mesh: {} patches, {} elements, {} dofs",
            ext.num_patches(),
            ext.num_active_elements,
            ext.num_active_dofs
        );
        Ok(ext)
    }

    /// Unique knot vectors taken from the patches, oriented along their edges
    fn unique_kv_from_patches(&self) -> anyhow::Result<Vec<KnotVector<T>>> {
        let num_kv = (0..self.topology.num_edges())
            .map(|e| self.knot_ind(e) + 1)
            .max()
            .unwrap_or(0);
        let mut unique: Vec<Option<KnotVector<T>>> = vec![None; num_kv];
        let dim = self.dimension();
        for (p, patch) in self.patches.iter().enumerate() {
            anyhow::ensure!(
                patch.num_directions() == dim,
                "patch {} has {} directions in a {}D mesh",
                p,
                patch.num_directions(),
                dim
            );
            let kvdir = self.check_kv_direction(p);
            let edges = self.topology.element_edges(p);
            for (d, i) in direction_edges(dim).iter().enumerate() {
                let k = self.knot_ind(edges[*i].0);
                if unique[k].is_none() {
                    let kv = patch.knot_vector(d);
                    unique[k] = Some(if kvdir[d] < 0 { kv.inverse() } else { kv.clone() });
                }
            }
        }
        unique
            .into_iter()
            .enumerate()
            .map(|(k, kv)| kv.ok_or_else(|| anyhow::anyhow!("knot vector {} is not set by any patch", k)))
            .collect()
    }

    /// Write the mesh in the format read by `try_from_str`
    pub fn write<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        self.topology.write(w)?;
        if self.have_patches() {
            write!(w, "\npatches\n")?;
            for (p, patch) in self.patches.iter().enumerate() {
                write!(w, "\n# patch {}\n\n", p)?;
                patch.write(w)?;
            }
            return Ok(());
        }

        write!(w, "\nknotvectors\n{}\n", self.knot_vectors.len())?;
        for kv in self.knot_vectors.iter() {
            writeln!(w, "{}", kv)?;
        }

        if self.num_active_elements < self.num_elements {
            write!(w, "\nmesh_elements\n{}\n", self.num_active_elements)?;
            for e in self.element_local_to_global() {
                writeln!(w, "{}", e)?;
            }
        }

        if !self.master.is_empty() {
            write!(
                w,
                "\nperiodic\n{}\n{}\n{}\n{}\n",
                self.master.len(),
                self.master.iter().join(" "),
                self.slave.len(),
                self.slave.iter().join(" ")
            )?;
        }

        write!(w, "\nweights\n")?;
        for v in self.weights.iter() {
            writeln!(w, "{}", v)?;
        }
        Ok(())
    }

    /// Summary of the entity counts followed by every unique knot vector
    pub fn print_characteristics<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        let orders = self.orders.iter().unique().join(" ");
        writeln!(w, "NURBS Mesh entity sizes:")?;
        writeln!(w, "Dimension           = {}", self.dimension())?;
        writeln!(w, "Unique Orders       = {}", orders)?;
        writeln!(w, "NumOfKnotVectors    = {}", self.num_knot_vectors())?;
        writeln!(w, "NumOfPatches        = {}", self.num_patches())?;
        writeln!(w, "NumOfBdrPatches     = {}", self.num_bdr_patches())?;
        writeln!(w, "NumOfVertices       = {}", self.global_num_vertices())?;
        writeln!(w, "NumOfElements       = {}", self.num_elements)?;
        writeln!(w, "NumOfBdrElements    = {}", self.num_bdr_elements)?;
        writeln!(w, "NumOfDofs           = {}", self.num_dofs)?;
        writeln!(w, "NumOfActiveVertices = {}", self.num_active_vertices)?;
        writeln!(w, "NumOfActiveElems    = {}", self.num_active_elements)?;
        writeln!(w, "NumOfActiveBdrElems = {}", self.num_active_bdr_elements)?;
        writeln!(w, "NumOfActiveDofs     = {}", self.num_active_dofs)?;
        for (i, kv) in self.knot_vectors.iter().enumerate() {
            writeln!(w, " {}) {}", i + 1, kv)?;
        }
        Ok(())
    }
}
