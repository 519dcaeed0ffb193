use crate::utils::js_string;

/// The chunk runtime: a module registry keyed by identity, a synchronous
/// require with caching, style injection, and an on-demand loader that
/// fetches a chunk's dependencies before executing it.
const RUNTIME_TEMPLATE: &str = r#"var __bindle_modules__ = {};
var __bindle_cache__ = {};
var __bindle_chunk_map__ = __CHUNK_MAP__;
function __bindle_register__(factories) {
  for (var id in factories) __bindle_modules__[id] = factories[id];
}
function __bindle_require__(id) {
  var cached = __bindle_cache__[id];
  if (cached) return cached.exports;
  var factory = __bindle_modules__[id];
  if (!factory) throw new Error("Module not found: " + id);
  var module = { id: id, exports: {} };
  __bindle_cache__[id] = module;
  factory(module, module.exports, __bindle_require__);
  return module.exports;
}
__bindle_require__.publicPath = __PUBLIC_PATH__;
__bindle_require__.register = __bindle_register__;
__bindle_require__.interop = function (exported) {
  return exported && exported.__esModule ? exported.default : exported;
};
__bindle_require__.css = function (text) {
  if (typeof document === "undefined") return text;
  var style = document.createElement("style");
  style.appendChild(document.createTextNode(text));
  document.head.appendChild(style);
  return text;
};
__bindle_require__.load = function (file) {
  return new Promise(function (resolve, reject) {
    var script = document.createElement("script");
    script.src = __bindle_require__.publicPath + file;
    script.onload = resolve;
    script.onerror = function () { reject(new Error("Failed to load " + file)); };
    document.head.appendChild(script);
  });
};
__bindle_require__.dynamic = function (id) {
  if (__bindle_modules__[id]) {
    return Promise.resolve().then(function () { return __bindle_require__(id); });
  }
  var hint = __bindle_chunk_map__[id];
  if (!hint) return Promise.reject(new Error("Unknown async module: " + id));
  var loads = hint.deps.concat([hint.file]).map(__bindle_require__.load);
  return Promise.all(loads).then(function () { return __bindle_require__(id); });
};
__bindle_require__.hot = function (factories) {
  for (var id in factories) {
    __bindle_modules__[id] = factories[id];
    delete __bindle_cache__[id];
  }
};
"#;

pub(crate) fn render_runtime(public_path: &str, chunk_map_json: &str) -> String {
  RUNTIME_TEMPLATE
    .replace("__PUBLIC_PATH__", &js_string(public_path))
    .replace("__CHUNK_MAP__", chunk_map_json)
}
