/// Adam optimizer over flat parameter groups.
///
/// m = β1 * m + (1 - β1) * grad
/// v = β2 * v + (1 - β2) * grad²
/// param -= lr * m̂ / (√v̂ + ε)
#[derive(Debug, Clone)]
pub struct Adam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub t: usize,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    /// `group_sizes` gives the length of every parameter group, in the order
    /// they are passed to `update`.
    pub fn new(group_sizes: &[usize], lr: f64) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: group_sizes.iter().map(|&n| vec![0.0; n]).collect(),
            v: group_sizes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }

    /// Advance the step counter. Call once per batch before `update`.
    pub fn step(&mut self) {
        self.t += 1;
    }

    pub fn update(&mut self, group: usize, params: &mut [f64], grads: &[f64]) {
        let t = self.t.max(1) as i32;
        let bias_correction1 = 1.0 - self.beta1.powi(t);
        let bias_correction2 = 1.0 - self.beta2.powi(t);
        let (m, v) = (&mut self.m[group], &mut self.v[group]);

        for (((p, &g), m), v) in params.iter_mut().zip(grads).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *p -= self.lr * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_adam_first_step_moves_by_lr() {
        let mut adam = Adam::new(&[2], 0.1);
        let mut params = vec![1.0, -1.0];
        adam.step();
        adam.update(0, &mut params, &[0.5, -2.0]);
        // bias-corrected first step is lr * sign(grad)
        assert_abs_diff_eq!(params[0], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(params[1], -0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_adam_minimises_quadratic() {
        let mut adam = Adam::new(&[1], 0.05);
        let mut x = vec![3.0];
        for _ in 0..2000 {
            let grad = vec![2.0 * (x[0] - 1.0)];
            adam.step();
            adam.update(0, &mut x, &grad);
        }
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-2);
    }
}
