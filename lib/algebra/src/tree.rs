/// The result of a tree rewrite, recording whether anything changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transformed<T> {
    pub data: T,
    pub transformed: bool,
}

impl<T> Transformed<T> {
    /// The rewrite changed `data`.
    pub fn yes(data: T) -> Self {
        Self {
            data,
            transformed: true,
        }
    }

    /// The rewrite left `data` unchanged.
    pub fn no(data: T) -> Self {
        Self {
            data,
            transformed: false,
        }
    }

    /// Applies `f` to the data, keeping the transformed flag.
    pub fn map_data<U>(self, f: impl FnOnce(T) -> U) -> Transformed<U> {
        Transformed {
            data: f(self.data),
            transformed: self.transformed,
        }
    }
}
